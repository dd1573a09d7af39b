//! WebSocket layer: session abstraction, the live session registry and the
//! upgrade handler.
//!
//! Any request carrying `Upgrade: websocket` is upgraded, whatever its
//! path. The channel is server-to-client only: one configuration document,
//! the live history, then one document per state change.

pub mod handler;
pub mod registry;
pub mod session;

pub use registry::{BroadcastReport, WebSocketRegistry};
pub use session::{Session, WsSession};
