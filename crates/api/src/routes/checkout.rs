//! Checkout intent endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use checkout::Currency;
use common::SessionToken;
use reservation_store::ReservationStore;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub session_token: String,
    pub country: String,
    pub currency: String,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub reference: String,
    pub currency: Currency,
    pub amount_cents: i64,
    pub gateway_public_key: String,
}

/// POST /api/v1/checkout — reconciles the session's cart against the
/// reservation ledger and returns a payment intent.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let currency = Currency::parse(&req.currency)
        .ok_or_else(|| ApiError::BadRequest(format!("unsupported currency: {}", req.currency)))?;
    let token = SessionToken::new(req.session_token);

    let intent = state
        .checkout
        .checkout_intent(&token, &req.country, currency)
        .await?;

    Ok(Json(CheckoutResponse {
        reference: intent.reference.as_str().to_string(),
        currency: intent.currency,
        amount_cents: intent.amount.minor(),
        gateway_public_key: intent.gateway_public_key,
    }))
}
