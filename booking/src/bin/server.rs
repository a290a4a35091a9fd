//! Auto-service booking server
//!
//! Serves the booking HTTP API.
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Installs the Prometheus exporter when `METRICS_PORT` is set
//! - Connects the configured stores (`STORE_BACKEND=memory|postgres`)
//! - Serves the API until Ctrl+C
//!
//! # Usage
//!
//! ```bash
//! # In-memory demo data
//! cargo run --bin server
//!
//! # PostgreSQL
//! STORE_BACKEND=postgres DATABASE_URL=postgres://localhost/autoshop cargo run --bin server
//! ```

use autoshop_booking::notification::ConsoleNotifier;
use autoshop_booking::server::{build_router, AppState};
use autoshop_booking::{metrics, BookingApp, Config, Stores};
use autoshop_core::environment::SystemClock;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,autoshop_booking=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting booking server...");

    let config = Config::from_env();
    tracing::info!(
        store = ?config.store,
        bind = %config.bind_address(),
        slot_minutes = config.booking.slot_minutes,
        "Configuration loaded"
    );

    if let Some(port) = config.server.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }
    metrics::register_business_metrics();

    let stores = Stores::from_config(&config).await?;
    let app = BookingApp::new(
        stores,
        Arc::new(ConsoleNotifier),
        Arc::new(SystemClock),
        &config.booking,
    );
    let router = build_router(AppState::new(app));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(addr = %listener.local_addr()?, "Booking server is running");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for Ctrl+C");
    }
    tracing::info!("Shutting down...");
}
