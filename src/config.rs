//! Status server configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). The accept backlog and worker pool size are fixed and
//! cannot be changed at runtime.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::StatusError;

/// Port used when neither the caller nor the environment names one.
pub const DEFAULT_PORT: u16 = 9999;

/// Maximum number of connections queued by the OS before being accepted.
pub const MAX_QUEUED_CONNECTIONS: u32 = 100;

/// Number of worker threads serving HTTP and WebSocket connections.
pub const WORKER_THREADS: usize = 16;

/// Product name used for the page title and the `Server` header.
pub const PRODUCT_NAME: &str = "Burst miner";

/// Value of the `Server` header on every response.
pub const SERVER_HEADER: &str = concat!("Burst miner ", env!("CARGO_PKG_VERSION"));

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level status server configuration.
///
/// Loaded once at startup via [`StatusServerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct StatusServerConfig {
    /// Address to bind the listener to. Its port is the default for
    /// [`crate::server::StatusServer::start`].
    pub listen_addr: SocketAddr,

    /// Directory holding `index.html` and the static assets.
    pub asset_root: PathBuf,

    /// Per-subscriber queue capacity of the change bus.
    pub change_bus_capacity: usize,

    /// Log line format.
    pub log_format: LogFormat,
}

impl Default for StatusServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            asset_root: PathBuf::from("public"),
            change_bus_capacity: 1024,
            log_format: LogFormat::Text,
        }
    }
}

impl StatusServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to the defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::Config`] if `STATUS_LISTEN_ADDR` is set but
    /// cannot be parsed as a [`SocketAddr`].
    pub fn from_env() -> Result<Self, StatusError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("STATUS_LISTEN_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| StatusError::Config(format!("STATUS_LISTEN_ADDR={raw}: {e}")))?,
            Err(_) => defaults.listen_addr,
        };

        let asset_root = std::env::var("STATUS_ASSET_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.asset_root);

        let change_bus_capacity =
            parse_env("STATUS_CHANGE_BUS_CAPACITY", defaults.change_bus_capacity).max(1);

        let log_format = match std::env::var("STATUS_LOG_FORMAT").ok().as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            asset_root,
            change_bus_capacity,
            log_format,
        })
    }

    /// Canonical textual form of the bind address, shown on the dashboard.
    #[must_use]
    pub fn canonical_ip(&self) -> String {
        self.listen_addr.ip().to_canonical().to_string()
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
