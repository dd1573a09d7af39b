//! Domain layer: serialized documents, template variables, the state-change
//! channel and the reference state owner.
//!
//! Nothing in this module knows about HTTP or WebSockets; the server layers
//! consume these types.

pub mod broadcast_message;
pub mod change_bus;
pub mod status_store;
pub mod template_vars;

pub use broadcast_message::BroadcastMessage;
pub use change_bus::{ChangeBus, StateChange};
pub use status_store::{ReplayProvider, StatusStore};
pub use template_vars::{TemplateVariables, format_deadline};
