//! # miner-status-server
//!
//! Real-time status server embedded in a background mining process.
//!
//! Serves the dashboard page and its static assets over HTTP, and streams
//! state changes to WebSocket clients. The mining engine is not part of
//! this crate: it owns the state, implements [`domain::ReplayProvider`]
//! and publishes changes on a [`domain::ChangeBus`].
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── dispatch → route (api/)
//!     │       ├── Root / Asset / NotFound / BadRequest handlers
//!     │       └── WebSocket upgrade (ws/)
//!     │
//!     ├── WebSocketRegistry (ws/) ◄── ChangeEventBridge (service/)
//!     │                                      ▲
//!     │                                      │ StateChange
//!     └── StatusServer (server)       ChangeBus (domain/) ◄── state owner
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
