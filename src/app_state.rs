//! Shared application state injected into the request dispatcher.

use std::fmt;
use std::sync::Arc;

use crate::api::router::AssetRoot;
use crate::domain::{ReplayProvider, TemplateVariables};
use crate::ws::{WebSocketRegistry, WsSession};

/// Shared state available to every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Live WebSocket sessions.
    pub registry: Arc<WebSocketRegistry<WsSession>>,
    /// Source of the documents replayed to new sessions.
    pub replay: Arc<dyn ReplayProvider>,
    /// Placeholder values for the root page.
    pub variables: Arc<TemplateVariables>,
    /// Directory the root page and assets are served from.
    pub assets: AssetRoot,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("variables", &self.variables)
            .field("assets", &self.assets)
            .finish_non_exhaustive()
    }
}
