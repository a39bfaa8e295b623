//! Camera price server
//!
//! Loads a trained model bundle once at startup and serves price
//! predictions over HTTP.

use anyhow::{Context, Result};
use camprice_server::{api, config::ServerConfig};
use price_lib::{ModelBundle, PredictionService, StructuredLogger};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting camprice-server");

    // Load configuration
    let config = ServerConfig::load().context("Failed to load server configuration")?;
    info!(
        bundle = %config.bundle_path.display(),
        policy = ?config.unresolved_brand_policy,
        "Server configured"
    );

    // A missing or corrupt bundle is fatal before the port is bound
    let bundle = ModelBundle::load(&config.bundle_path).with_context(|| {
        format!(
            "Failed to load model bundle from {}",
            config.bundle_path.display()
        )
    })?;

    let logger = StructuredLogger::new("camprice-server");
    let service = PredictionService::new(bundle, config.unresolved_brand_policy, logger.clone());
    let app_state = Arc::new(api::AppState::new(service));

    logger.log_startup(
        SERVICE_VERSION,
        &config.bundle_path.display().to_string(),
        config.port,
    );

    let api_handle = tokio::spawn(api::serve(config.bind_addr(), app_state));

    // Wait for shutdown signal or a server failure
    tokio::select! {
        result = api_handle => {
            result.context("API server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
            info!("Shutting down");
        }
    }

    Ok(())
}
