//! miner-status-server entry point.
//!
//! Runs the status server on its own with an in-memory state owner, until
//! Ctrl-C.

use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::EnvFilter;

use miner_status_server::config::{LogFormat, SERVER_HEADER, StatusServerConfig};
use miner_status_server::domain::{ChangeBus, StatusStore};
use miner_status_server::server::StatusServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = StatusServerConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(addr = %config.listen_addr, assets = %config.asset_root.display(), "starting status server");

    // Build the state owner
    let bus = ChangeBus::new(config.change_bus_capacity);
    let store = Arc::new(StatusStore::new(
        json!({
            "type": "config",
            "version": SERVER_HEADER,
            "serverUrl": format!("http://{}", config.listen_addr),
        }),
        bus.clone(),
    ));

    // Start serving; a failed start is logged and the process keeps running
    let mut server = StatusServer::new(config, store, bus);
    if server.start(None).await.is_err() {
        tracing::warn!("status server unavailable");
    }

    tokio::signal::ctrl_c().await?;
    server.stop().await;

    Ok(())
}
