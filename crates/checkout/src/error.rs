//! Checkout domain error types.

use common::Sku;
use reservation_store::StoreError;
use thiserror::Error;

use crate::money::Currency;

/// Errors that can occur while coordinating a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The requested quantity is unattainable for a SKU. Covers both
    /// "never had enough" and "lost the race to another session"; the
    /// caller cannot distinguish the two.
    #[error("SKU {sku} is out of stock")]
    OutOfStock { sku: Sku },

    /// The SKU does not exist in the catalog.
    #[error("unknown SKU {sku}")]
    UnknownSku { sku: Sku },

    /// No shopping session matches the presented token, or the session
    /// has expired.
    #[error("shopping session not found")]
    SessionNotFound,

    /// The session has no cart items to reconcile.
    #[error("cart is empty")]
    CartEmpty,

    /// The pricing collaborator has no price for a cart line.
    #[error("no {currency} price for SKU {sku}")]
    PriceUnavailable { sku: Sku, currency: Currency },

    /// An infrastructure failure in the reservation store that is not a
    /// stock conflict.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CheckoutError {
    fn from(e: StoreError) -> Self {
        match e {
            // Stock conflicts surface as out-of-stock; everything else is
            // a genuine infrastructure failure.
            StoreError::InsufficientStock { sku } => CheckoutError::OutOfStock { sku },
            other => CheckoutError::Store(other),
        }
    }
}
