//! Domain layer of the storefront reservation core.
//!
//! The [`CheckoutService`] reconciles a session's cart snapshot against
//! the reservation ledger and inventory store, producing a payment
//! intent. The [`ExpiryReaper`] periodically releases stale unconfirmed
//! holds. Pricing, tax, shipping, and the payment gateway are external
//! collaborators behind traits.

pub mod error;
pub mod money;
pub mod reaper;
pub mod service;
pub mod services;

pub use common::{CheckoutRef, SessionId, SessionToken, Sku};
pub use error::CheckoutError;
pub use money::{Currency, Money};
pub use reaper::ExpiryReaper;
pub use service::{CheckoutService, PaymentIntent};
pub use services::gateway::{PaymentGateway, StaticPaymentGateway};
pub use services::pricing::{InMemoryPricingService, PricingService};
pub use services::shipping::{InMemoryShippingService, ShippingService};
pub use services::tax::{FixedTaxService, TaxRate, TaxService};
