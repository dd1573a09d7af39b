//! Forwards state changes from the [`ChangeBus`] to every WebSocket session.
//!
//! The bridge subscribes once per server start. Each change is encoded
//! once, outside the registry lock, and the same bytes go to every session.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::{BroadcastMessage, ChangeBus, StateChange};
use crate::ws::{BroadcastReport, Session, WebSocketRegistry};

/// Subscriber that turns [`StateChange`]s into registry broadcasts.
#[derive(Debug)]
pub struct ChangeEventBridge<S> {
    registry: Arc<WebSocketRegistry<S>>,
}

impl<S: Session> ChangeEventBridge<S> {
    /// Creates a bridge feeding `registry`.
    #[must_use]
    pub fn new(registry: Arc<WebSocketRegistry<S>>) -> Self {
        Self { registry }
    }

    /// Subscribes to `bus` and forwards changes on a background task until
    /// every bus handle is dropped or the task is aborted.
    #[must_use]
    pub fn spawn(self, bus: &ChangeBus) -> JoinHandle<()> {
        let rx = bus.subscribe();
        tokio::spawn(self.run(rx))
    }

    /// Receive loop. Changes are forwarded one at a time in publish order;
    /// a slow broadcast fills this subscriber's queue and the publisher
    /// waits.
    pub async fn run(self, mut rx: mpsc::Receiver<StateChange>) {
        while let Some(change) = rx.recv().await {
            let _ = self.forward(change).await;
        }
        tracing::debug!("change bridge stopped");
    }

    /// Encodes one change and broadcasts it.
    ///
    /// The change is consumed and released on every path, including an
    /// encoding failure, so the owner never waits on it.
    pub async fn forward(&self, change: StateChange) -> BroadcastReport {
        let message = match BroadcastMessage::from_json(change.snapshot()) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "could not encode state change");
                drop(change);
                return BroadcastReport::default();
            }
        };
        drop(change);

        let report = self.registry.broadcast(&message).await;
        if report.removed > 0 {
            tracing::debug!(
                delivered = report.delivered,
                removed = report.removed,
                "dropped failing websocket sessions"
            );
        }
        report
    }
}
