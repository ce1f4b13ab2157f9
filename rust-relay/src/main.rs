//! Dynamic Content to Algolia relay server.
//!
//! On startup this binary:
//! 1. Loads configuration from the environment (and `.env` if present)
//! 2. Optionally verifies the Dynamic Content and Algolia credentials
//! 3. Serves `POST /webhook` and `GET /health` until SIGINT/SIGTERM

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dcrelay::util::SystemClock;
use dcrelay::{router, AlgoliaClient, AppState, Config, DynamicContentClient, WebhookProcessor};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_starting");

    // Load configuration
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        port = config.port,
        index_name = %config.index_name,
        content_resolution = ?config.content.strategy,
        content_type_whitelist = %config.whitelists.content_types,
        property_whitelist = %config.whitelists.properties,
        add_timestamps = config.add_timestamps,
        "config_loaded"
    );

    // Create collaborator clients
    let content = DynamicContentClient::new(config.content.clone())
        .context("Failed to create Dynamic Content client")?;
    let algolia =
        AlgoliaClient::new(config.algolia.clone()).context("Failed to create Algolia client")?;

    if config.validate_credentials {
        content
            .verify_credentials()
            .await
            .context("Dynamic Content credentials check failed")?;
        algolia
            .verify_credentials(&config.index_name)
            .await
            .context("Algolia credentials check failed")?;
    } else {
        info!("credential_checks_skipped");
    }

    let processor = WebhookProcessor::new(
        Arc::new(content),
        Arc::new(algolia),
        Arc::new(SystemClock),
        config.processor_settings(),
    );

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, processor));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}
