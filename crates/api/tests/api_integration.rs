//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use checkout::{Currency, Money};
use common::Sku;
use metrics_exporter_prometheus::PrometheusHandle;
use reservation_store::{InMemoryReservationStore, ReservationStore};
use tower::ServiceExt;

use api::routes::AppState;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (axum::Router, Arc<AppState<InMemoryReservationStore>>) {
    let store = InMemoryReservationStore::new();
    let state = api::create_state(store, 15, std::time::Duration::from_secs(60)).await;

    state.store.insert_sku(&Sku::new("SKU-001"), 10).await.unwrap();
    state.store.insert_sku(&Sku::new("SKU-002"), 2).await.unwrap();
    state
        .pricing
        .set_price("SKU-001", Currency::Usd, Money::from_minor(1000))
        .await;
    state
        .pricing
        .set_price("SKU-002", Currency::Usd, Money::from_minor(2500))
        .await;

    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "storefront-api");
}

#[tokio::test]
async fn test_cart_then_checkout_flow() {
    let (app, state) = setup().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/cart",
            serde_json::json!({ "session_token": "shopper-1", "sku": "SKU-001", "qty": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/checkout",
            serde_json::json!({
                "session_token": "shopper-1",
                "country": "nigeria",
                "currency": "USD"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    // 2 × 10.00 = 20.00; 7.5% tax = 1.50; default shipping 20.00.
    assert_eq!(json["amount_cents"], 4350);
    assert_eq!(json["currency"], "USD");
    assert!(json["reference"].as_str().is_some());
    assert!(json["gateway_public_key"].as_str().is_some());

    assert_eq!(
        state.store.available(&Sku::new("SKU-001")).await.unwrap(),
        Some(8)
    );
}

#[tokio::test]
async fn test_checkout_out_of_stock_is_conflict() {
    let (app, _) = setup().await;

    // Both shoppers want both remaining units of SKU-002.
    for token in ["alice", "bob"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/cart",
                serde_json::json!({ "session_token": token, "sku": "SKU-002", "qty": 2 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let checkout = |token: &str| {
        json_request(
            "POST",
            "/api/v1/checkout",
            serde_json::json!({
                "session_token": token,
                "country": "nigeria",
                "currency": "USD"
            }),
        )
    };

    let first = app.clone().oneshot(checkout("alice")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(checkout("bob")).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert!(json["error"].as_str().unwrap().contains("SKU-002"));
}

#[tokio::test]
async fn test_checkout_without_session_is_not_found() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/checkout",
            serde_json::json!({
                "session_token": "nobody",
                "country": "nigeria",
                "currency": "USD"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_with_unsupported_currency_is_bad_request() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/checkout",
            serde_json::json!({
                "session_token": "shopper-1",
                "country": "nigeria",
                "currency": "EUR"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_delete_then_checkout_is_empty() {
    let (app, _) = setup().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/cart",
            serde_json::json!({ "session_token": "shopper-1", "sku": "SKU-001", "qty": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/cart/SKU-001?session_token=shopper-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/checkout",
            serde_json::json!({
                "session_token": "shopper-1",
                "country": "nigeria",
                "currency": "USD"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_success_confirms_reference() {
    let (app, state) = setup().await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/cart",
            serde_json::json!({ "session_token": "shopper-1", "sku": "SKU-001", "qty": 3 }),
        ))
        .await
        .unwrap();

    let checkout = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/checkout",
            serde_json::json!({
                "session_token": "shopper-1",
                "country": "nigeria",
                "currency": "USD"
            }),
        ))
        .await
        .unwrap();
    let reference = body_json(checkout).await["reference"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/payment/webhook",
            serde_json::json!({ "reference": reference, "status": "success" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["reservations"], 1);

    // Re-delivery of the webhook touches nothing.
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/payment/webhook",
            serde_json::json!({ "reference": json["reference"], "status": "success" }),
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["reservations"], 0);

    assert_eq!(
        state.store.available(&Sku::new("SKU-001")).await.unwrap(),
        Some(7)
    );
}

#[tokio::test]
async fn test_webhook_failure_releases_reference() {
    let (app, state) = setup().await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/cart",
            serde_json::json!({ "session_token": "shopper-1", "sku": "SKU-001", "qty": 3 }),
        ))
        .await
        .unwrap();

    let checkout = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/checkout",
            serde_json::json!({
                "session_token": "shopper-1",
                "country": "nigeria",
                "currency": "USD"
            }),
        ))
        .await
        .unwrap();
    let reference = body_json(checkout).await["reference"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/payment/webhook",
            serde_json::json!({ "reference": reference, "status": "failed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        state.store.available(&Sku::new("SKU-001")).await.unwrap(),
        Some(10)
    );
}

#[tokio::test]
async fn test_cron_sweep_reports_counts() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/cron")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["released"], 0);
    assert_eq!(json["failed"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
