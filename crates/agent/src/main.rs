//! Heat agent - shard temperature evaluation
//!
//! Runs next to a search node, turns collector snapshots into per-shard
//! temperatures every interval and serves them over HTTP.

use anyhow::{Context, Result};
use heat_agent::{api, config};
use heat_lib::{
    health::HealthRegistry,
    observability::{HeatMetrics, StructuredLogger},
    pyrometer::{NodeTemperatureState, Pyrometer},
    source::SnapshotDirSource,
};
use prometheus::Registry;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting heat-agent");

    let config = config::AgentConfig::load()?;
    let evaluation = config.evaluation_config()?;
    info!(
        node_name = %config.node_name,
        snapshot_dir = %config.snapshot_dir.display(),
        "Agent configured"
    );

    let registry = Registry::new();
    let metrics = HeatMetrics::new(&registry).context("Failed to register metrics")?;
    let health_registry = HealthRegistry::with_unhealthy_after(config.unhealthy_after);

    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(AGENT_VERSION, &evaluation.dimensions);

    let state = Arc::new(NodeTemperatureState::new());
    let pyrometer = Pyrometer::new(
        Arc::new(SnapshotDirSource::new(&config.snapshot_dir)),
        state.clone(),
        evaluation,
        metrics,
        health_registry.clone(),
        logger.clone(),
    )
    .context("Invalid evaluation configuration")?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let loop_handle = tokio::spawn(Arc::new(pyrometer).run(shutdown_rx));

    let app_state = Arc::new(api::AppState::new(health_registry, registry, state));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
                Ok(Ok(())) => {}
            }
            logger.log_shutdown("API server stopped");
        }
    }

    let _ = shutdown_tx.send(());
    loop_handle.await.context("Evaluation loop panicked")?;
    info!("Shutting down");

    Ok(())
}
