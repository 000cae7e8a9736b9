//! Cart management endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{SessionToken, Sku};
use reservation_store::ReservationStore;
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub session_token: String,
    pub sku: String,
    pub qty: u32,
}

#[derive(Deserialize)]
pub struct CartSessionQuery {
    pub session_token: String,
}

/// POST /api/v1/cart — writes a cart line, creating the session on
/// first interaction. A quantity of zero removes the line.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddToCartRequest>,
) -> Result<StatusCode, ApiError> {
    let token = SessionToken::new(req.session_token);
    let sku = Sku::new(req.sku);
    state.checkout.add_to_cart(&token, &sku, req.qty).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/cart/{sku} — removes a cart line if it exists.
#[tracing::instrument(skip(state, query))]
pub async fn remove<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(sku): Path<String>,
    Query(query): Query<CartSessionQuery>,
) -> Result<StatusCode, ApiError> {
    let token = SessionToken::new(query.session_token);
    state
        .checkout
        .remove_from_cart(&token, &Sku::new(sku))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
