//! HTTP route handlers and shared application state.

pub mod cart;
pub mod checkout;
pub mod cron;
pub mod health;
pub mod metrics;
pub mod payments;

use ::checkout::{
    CheckoutService, ExpiryReaper, FixedTaxService, InMemoryPricingService,
    InMemoryShippingService, StaticPaymentGateway,
};
use reservation_store::ReservationStore;

/// The coordinator as wired for the HTTP surface: in-memory pricing,
/// fixed-rate tax, per-country shipping, static gateway credentials.
pub type Storefront<S> = CheckoutService<
    S,
    InMemoryPricingService,
    FixedTaxService,
    InMemoryShippingService,
    StaticPaymentGateway,
>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: ReservationStore> {
    pub checkout: Storefront<S>,
    pub reaper: ExpiryReaper<S>,
    pub store: S,
    pub pricing: InMemoryPricingService,
}
