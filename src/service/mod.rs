//! Service layer: the bridge from the state owner's change channel into the
//! WebSocket broadcast path.

pub mod change_bridge;

pub use change_bridge::ChangeEventBridge;
