//! API server entry point.

use checkout::ExpiryReaper;
use reservation_store::{InMemoryReservationStore, PostgresReservationStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::config::Config;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve(app: axum::Router, addr: &str) {
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let reaper_interval = std::time::Duration::from_secs(config.reaper_interval_secs);

    // 3. Create the store, state, and background reaper, then serve.
    // PostgreSQL when DATABASE_URL is set, in-memory otherwise.
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresReservationStore::new(pool);
            store.run_migrations().await.expect("migrations failed");

            let state =
                api::create_state(store.clone(), config.hold_minutes, reaper_interval).await;
            tokio::spawn(ExpiryReaper::new(store, reaper_interval).run());

            let app = api::create_app(state, metrics_handle);
            serve(app, &config.addr()).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            let store = InMemoryReservationStore::new();

            let state =
                api::create_state(store.clone(), config.hold_minutes, reaper_interval).await;
            tokio::spawn(ExpiryReaper::new(store, reaper_interval).run());

            let app = api::create_app(state, metrics_handle);
            serve(app, &config.addr()).await;
        }
    }
}
