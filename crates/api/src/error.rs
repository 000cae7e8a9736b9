//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout coordination error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::OutOfStock { .. } => (StatusCode::CONFLICT, err.to_string()),
        CheckoutError::UnknownSku { .. } | CheckoutError::SessionNotFound => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        CheckoutError::CartEmpty => (StatusCode::BAD_REQUEST, err.to_string()),
        CheckoutError::PriceUnavailable { .. } | CheckoutError::Store(_) => {
            tracing::error!(error = %err, "checkout failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<reservation_store::StoreError> for ApiError {
    fn from(err: reservation_store::StoreError) -> Self {
        ApiError::Checkout(err.into())
    }
}
