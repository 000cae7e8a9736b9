//! HTTP API server with observability for the storefront reservation core.
//!
//! Provides REST endpoints for cart management, checkout, the payment
//! webhook, and the expiry sweep, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use checkout::{
    CheckoutService, Currency, ExpiryReaper, FixedTaxService, InMemoryPricingService,
    InMemoryShippingService, Money, StaticPaymentGateway,
};
use metrics_exporter_prometheus::PrometheusHandle;
use reservation_store::ReservationStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ReservationStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/v1/cart", post(routes::cart::add::<S>))
        .route("/api/v1/cart/{sku}", delete(routes::cart::remove::<S>))
        .route("/api/v1/checkout", post(routes::checkout::create::<S>))
        .route(
            "/api/v1/payment/webhook",
            post(routes::payments::webhook::<S>),
        )
        .route("/api/v1/cron", get(routes::cron::sweep::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state around a store, wiring the coordinator to
/// in-memory pricing/tax/shipping providers and a static gateway.
pub async fn create_state<S: ReservationStore + Clone + 'static>(
    store: S,
    hold_minutes: i64,
    reaper_interval: std::time::Duration,
) -> Arc<AppState<S>> {
    let pricing = InMemoryPricingService::new();
    let shipping = InMemoryShippingService::new();
    shipping
        .set_default(Currency::Usd, Money::from_minor(2000))
        .await;

    let checkout = CheckoutService::new(
        store.clone(),
        pricing.clone(),
        FixedTaxService::default(),
        shipping,
        StaticPaymentGateway::default(),
        hold_minutes,
    );
    let reaper = ExpiryReaper::new(store.clone(), reaper_interval);

    Arc::new(AppState {
        checkout,
        reaper,
        store,
        pricing,
    })
}
