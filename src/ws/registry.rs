//! Live WebSocket session set with replay-on-connect and fan-out.
//!
//! [`WebSocketRegistry`] owns every admitted session behind a single
//! [`tokio::sync::Mutex`]. `connect`, `broadcast` and `disconnect_all` hold
//! that lock for their whole duration, so they never interleave: a session
//! admitted after a broadcast started does not see that broadcast, and a
//! session being replayed cannot miss a change published meanwhile.
//!
//! # Failure semantics
//!
//! - A transport error on send removes the session in the same pass.
//! - A send that reports fewer bytes than the document holds is logged at
//!   error level, but the session stays registered.

use tokio::sync::Mutex;

use super::session::Session;
use crate::domain::{BroadcastMessage, ReplayProvider};
use crate::error::{SessionError, StatusError};

/// Outcome of one [`WebSocketRegistry::broadcast`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions that accepted the message.
    pub delivered: usize,
    /// Sessions removed because their send failed.
    pub removed: usize,
}

/// The set of live sessions.
#[derive(Debug)]
pub struct WebSocketRegistry<S> {
    sessions: Mutex<Vec<S>>,
}

impl<S: Session> WebSocketRegistry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Replays the configuration document and the live history to
    /// `session`, then admits it.
    ///
    /// Nothing is registered until every replayed document has been sent.
    /// On the first failed send the session is closed and dropped; there is
    /// no partial admission and no retry.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::Serialize`] if the configuration or an entry
    /// cannot be encoded, or [`StatusError::Send`] if the transport failed.
    pub async fn connect(
        &self,
        mut session: S,
        replay: &dyn ReplayProvider,
    ) -> Result<(), StatusError> {
        let mut sessions = self.sessions.lock().await;

        if let Err(err) = replay_to(&mut session, replay).await {
            tracing::debug!(session_id = %session.id(), error = %err, "discarding session after failed replay");
            session.close().await;
            return Err(err);
        }

        tracing::debug!(session_id = %session.id(), live = sessions.len() + 1, "session admitted");
        sessions.push(session);
        Ok(())
    }

    /// Sends `message` to every registered session, removing each one whose
    /// send fails.
    pub async fn broadcast(&self, message: &BroadcastMessage) -> BroadcastReport {
        let mut sessions = self.sessions.lock().await;
        let mut report = BroadcastReport::default();

        let mut index = 0;
        while let Some(session) = sessions.get_mut(index) {
            match deliver(session, message.as_str()).await {
                Ok(()) => {
                    report.delivered += 1;
                    index += 1;
                }
                Err(err) => {
                    tracing::debug!(session_id = %session.id(), error = %err, "could not send to websocket, removing session");
                    drop(sessions.remove(index));
                    report.removed += 1;
                }
            }
        }

        report
    }

    /// Closes and forgets every session. Returns how many were closed.
    pub async fn disconnect_all(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let count = sessions.len();
        for mut session in sessions.drain(..) {
            session.close().await;
        }
        if count > 0 {
            tracing::info!(closed = count, "all websocket sessions disconnected");
        }
        count
    }

    /// Forgets every session without writing to it. Used once the transport
    /// is already gone. Returns how many were dropped.
    pub async fn discard_all(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let count = sessions.len();
        sessions.clear();
        count
    }

    /// Returns the number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Returns `true` if no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl<S: Session> Default for WebSocketRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends the configuration document followed by each history entry.
async fn replay_to<S: Session>(
    session: &mut S,
    replay: &dyn ReplayProvider,
) -> Result<(), StatusError> {
    let configuration = BroadcastMessage::from_json(&replay.configuration())?;
    deliver(session, configuration.as_str()).await?;

    if let Some(entries) = replay.history() {
        for entry in &entries {
            let entry = BroadcastMessage::from_json(entry)?;
            deliver(session, entry.as_str()).await?;
        }
    }

    Ok(())
}

/// Sends one frame. A short write is reported but is not a failure.
async fn deliver<S: Session>(session: &mut S, text: &str) -> Result<(), SessionError> {
    let written = session.send_text(text).await?;
    if written != text.len() {
        tracing::error!(
            session_id = %session.id(),
            written,
            expected = text.len(),
            "could not fully send: {text}"
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::ws::session::testing::MockSession;

    struct FixedReplay {
        configuration: Value,
        history: Option<Vec<Value>>,
    }

    impl ReplayProvider for FixedReplay {
        fn configuration(&self) -> Value {
            self.configuration.clone()
        }

        fn history(&self) -> Option<Vec<Value>> {
            self.history.clone()
        }
    }

    fn no_state() -> FixedReplay {
        FixedReplay {
            configuration: json!({"type": "config"}),
            history: None,
        }
    }

    fn with_entries(count: usize) -> FixedReplay {
        FixedReplay {
            configuration: json!({"type": "config"}),
            history: Some((0..count).map(|i| json!({"entry": i})).collect()),
        }
    }

    #[tokio::test]
    async fn connect_without_live_state_sends_only_configuration() {
        let registry = WebSocketRegistry::new();
        let (session, transcript) = MockSession::healthy();

        let result = registry.connect(session, &no_state()).await;

        assert!(result.is_ok());
        assert_eq!(transcript.frames(), vec![r#"{"type":"config"}"#.to_string()]);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn connect_replays_configuration_then_entries_in_order() {
        let registry = WebSocketRegistry::new();
        let (session, transcript) = MockSession::healthy();

        let result = registry.connect(session, &with_entries(3)).await;

        assert!(result.is_ok());
        assert_eq!(
            transcript.frames(),
            vec![
                r#"{"type":"config"}"#.to_string(),
                r#"{"entry":0}"#.to_string(),
                r#"{"entry":1}"#.to_string(),
                r#"{"entry":2}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn failed_configuration_send_discards_session() {
        let registry = WebSocketRegistry::new();
        let (session, transcript) = MockSession::failing_at(0);

        let result = registry.connect(session, &with_entries(2)).await;

        assert!(matches!(result, Err(StatusError::Send(_))));
        assert!(transcript.frames().is_empty());
        assert!(transcript.is_closed());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn failed_history_send_stops_replay_and_discards_session() {
        let registry = WebSocketRegistry::new();
        let (session, transcript) = MockSession::failing_at(2);

        let result = registry.connect(session, &with_entries(4)).await;

        assert!(result.is_err());
        assert_eq!(transcript.frames().len(), 2);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_session() {
        let registry = WebSocketRegistry::new();
        let mut transcripts = Vec::new();
        for _ in 0..3 {
            let (session, transcript) = MockSession::healthy();
            let _ = registry.connect(session, &no_state()).await;
            transcripts.push(transcript);
        }

        let report = registry.broadcast(&BroadcastMessage::from("tick")).await;

        assert_eq!(report, BroadcastReport { delivered: 3, removed: 0 });
        for transcript in &transcripts {
            assert_eq!(transcript.frames().last().map(String::as_str), Some("tick"));
        }
    }

    #[tokio::test]
    async fn broadcast_removes_only_the_failing_session() {
        let registry = WebSocketRegistry::new();
        let mut transcripts = Vec::new();
        for k in 0..4 {
            // Session 2 fails on its second send: the first broadcast.
            let (session, transcript) = if k == 2 {
                MockSession::failing_at(1)
            } else {
                MockSession::healthy()
            };
            let _ = registry.connect(session, &no_state()).await;
            transcripts.push(transcript);
        }
        assert_eq!(registry.len().await, 4);

        let report = registry.broadcast(&BroadcastMessage::from("block")).await;

        assert_eq!(report, BroadcastReport { delivered: 3, removed: 1 });
        assert_eq!(registry.len().await, 3);
        for (k, transcript) in transcripts.iter().enumerate() {
            let received = transcript.frames().iter().filter(|f| *f == "block").count();
            assert_eq!(received, usize::from(k != 2), "session {k}");
        }
    }

    #[tokio::test]
    async fn short_write_keeps_session() {
        let registry = WebSocketRegistry::new();
        let (session, transcript) = MockSession::short_writing();

        assert!(registry.connect(session, &with_entries(1)).await.is_ok());
        let report = registry.broadcast(&BroadcastMessage::from("partial")).await;

        assert_eq!(report.removed, 0);
        assert_eq!(registry.len().await, 1);
        assert_eq!(transcript.frames().len(), 3);
    }

    #[tokio::test]
    async fn broadcast_on_empty_registry_is_noop() {
        let registry: WebSocketRegistry<MockSession> = WebSocketRegistry::new();
        let report = registry.broadcast(&BroadcastMessage::from("x")).await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn disconnect_all_closes_and_is_idempotent() {
        let registry = WebSocketRegistry::new();
        let (a, ta) = MockSession::healthy();
        let (b, tb) = MockSession::healthy();
        let _ = registry.connect(a, &no_state()).await;
        let _ = registry.connect(b, &no_state()).await;

        assert_eq!(registry.disconnect_all().await, 2);
        assert!(ta.is_closed() && tb.is_closed());
        assert!(registry.is_empty().await);

        assert_eq!(registry.disconnect_all().await, 0);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn discard_all_drops_without_closing() {
        let registry = WebSocketRegistry::new();
        let (session, transcript) = MockSession::healthy();
        let _ = registry.connect(session, &no_state()).await;

        assert_eq!(registry.discard_all().await, 1);
        assert!(!transcript.is_closed());
        assert!(registry.is_empty().await);
    }
}
