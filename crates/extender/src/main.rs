//! Network traffic scheduler extender
//!
//! Runs next to the scheduler and answers prioritize requests by ranking
//! candidate nodes on their recent received network traffic.

use anyhow::{Context, Result};
use netscore_lib::{
    health::HealthRegistry,
    observability::{PluginMetrics, StructuredLogger},
    CancellationToken, NetworkTraffic, PLUGIN_NAME,
};
use netscore_extender::{api, config::ExtenderConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXTENDER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting netscore-extender");

    let config = ExtenderConfig::load()?;
    info!(
        listen_port = config.listen_port,
        prometheus = %config.plugin.address,
        "Extender configured"
    );

    let metrics = PluginMetrics::new();
    let logger = StructuredLogger::new(PLUGIN_NAME).with_metrics(metrics.clone());

    let plugin = NetworkTraffic::new(&config.plugin, Arc::new(logger.clone()))
        .context("Failed to initialize network traffic plugin")?;
    logger.log_startup(
        EXTENDER_VERSION,
        &config.plugin.address,
        &config.plugin.network_interface,
    );

    let health_registry = HealthRegistry::new();
    api::register_components(&health_registry).await;
    health_registry.set_ready(true).await;

    let shutdown = CancellationToken::new();
    let app_state = Arc::new(api::AppState::new(
        Arc::new(plugin),
        health_registry,
        metrics,
        shutdown.clone(),
    ));

    let server = tokio::spawn(api::serve(config.listen_port, app_state));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    shutdown.cancel();

    server.await??;
    info!("Shut down");

    Ok(())
}
