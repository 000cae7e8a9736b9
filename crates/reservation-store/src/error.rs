use common::Sku;
use thiserror::Error;

/// Errors that can occur when interacting with the reservation store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional inventory decrement could not be applied. The caller
    /// cannot tell "raced and lost" apart from "never had enough"; both
    /// surface as this variant.
    #[error("insufficient stock for SKU {sku}")]
    InsufficientStock { sku: Sku },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for reservation store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
