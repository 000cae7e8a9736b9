//! Shared identifier types used across the storefront reservation core.

pub mod types;

pub use types::{CheckoutRef, SessionId, SessionToken, Sku};
