//! # Validator Coordination Node
//!
//! Usage: `node-runtime [config.toml]`. The path may also be given in
//! `VC_CONFIG`. Without one, defaults plus `VC_*` overrides are used.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use node_runtime::{telemetry, Coordinator, NodeConfig, TracingBenchable};

const CONFIG_PATH_ENV: &str = "VC_CONFIG";

fn config_path() -> Option<PathBuf> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .map(PathBuf::from)
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path();
    let config = NodeConfig::load(path.as_deref()).context("Failed to load node configuration")?;
    telemetry::init_tracing(&config.logging).context("Failed to initialise tracing")?;

    info!("===========================================");
    info!("  Validator Coordination Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    if let Some(path) = &path {
        info!("Config: {}", path.display());
    }

    let coordinator = Coordinator::new(&config, None, Arc::new(TracingBenchable))
        .context("Failed to start coordinator")?;
    let validators = coordinator
        .refresh_validators()
        .await
        .context("No validators available")?;
    info!("{}", coordinator.manager());
    info!(
        validators = validators.len(),
        total_weight = validators.total_weight(),
        "Node is running. Press Ctrl+C to stop."
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down");
    Ok(())
}
