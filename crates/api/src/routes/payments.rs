//! Payment gateway webhook endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::CheckoutRef;
use reservation_store::ReservationStore;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
}

#[derive(Deserialize)]
pub struct WebhookRequest {
    pub reference: String,
    pub status: PaymentStatus,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub reference: String,
    pub status: PaymentStatus,
    pub reservations: u64,
}

/// POST /api/v1/payment/webhook — confirms or releases the holds behind
/// a payment reference. Idempotent: a repeated notification touches zero
/// rows.
#[tracing::instrument(skip(state, req))]
pub async fn webhook<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<WebhookRequest>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let reference = CheckoutRef::new(req.reference.clone());
    let reservations = match req.status {
        PaymentStatus::Success => state.checkout.confirm_payment(&reference).await?,
        PaymentStatus::Failed => state.checkout.release_payment(&reference).await?,
    };

    Ok(Json(WebhookResponse {
        reference: req.reference,
        status: req.status,
        reservations,
    }))
}
