//! Outbound half of a WebSocket connection.
//!
//! The registry only ever writes to sessions, so [`Session`] covers the
//! write side: send one text frame, or close. [`WsSession`] adapts the
//! sink half of an Axum [`WebSocket`].

use std::fmt;
use std::future::Future;

use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use futures_util::stream::SplitSink;
use uuid::Uuid;

use crate::error::SessionError;

/// Write side of one WebSocket connection.
pub trait Session: Send + 'static {
    /// Identifier used in log records.
    fn id(&self) -> Uuid;

    /// Sends `text` as one text frame.
    ///
    /// Returns the number of bytes the transport accepted. Only an `Err`
    /// counts as a failed send.
    fn send_text(&mut self, text: &str) -> impl Future<Output = Result<usize, SessionError>> + Send;

    /// Closes the connection. Errors are ignored.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// [`Session`] over the sink half of an Axum WebSocket.
///
/// Once closed, every further send fails with [`SessionError::Closed`]
/// without touching the transport.
pub struct WsSession {
    id: Uuid,
    sink: SplitSink<WebSocket, Message>,
    closed: bool,
}

impl WsSession {
    /// Wraps the sink half of a split socket.
    #[must_use]
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sink,
            closed: false,
        }
    }
}

impl fmt::Debug for WsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsSession")
            .field("id", &self.id)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Session for WsSession {
    fn id(&self) -> Uuid {
        self.id
    }

    async fn send_text(&mut self, text: &str) -> Result<usize, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        self.sink
            .send(Message::text(text))
            .await
            .map(|()| text.len())
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        self.closed = true;
        let _ = self.sink.close().await;
    }
}


#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable in-memory session for registry tests.

    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// Everything written to a [`MockSession`], shared with the test.
    #[derive(Debug, Default)]
    pub(crate) struct Transcript {
        pub(crate) frames: Mutex<Vec<String>>,
        pub(crate) closed: Mutex<bool>,
    }

    impl Transcript {
        pub(crate) fn frames(&self) -> Vec<String> {
            self.frames.lock().clone()
        }

        pub(crate) fn is_closed(&self) -> bool {
            *self.closed.lock()
        }
    }

    #[derive(Debug)]
    pub(crate) struct MockSession {
        id: Uuid,
        transcript: Arc<Transcript>,
        /// Zero-based index of the send that fails, if any.
        fail_at: Option<usize>,
        /// Report one byte fewer than requested on every send.
        short_writes: bool,
        sent: usize,
    }

    impl MockSession {
        pub(crate) fn healthy() -> (Self, Arc<Transcript>) {
            Self::build(None, false)
        }

        pub(crate) fn failing_at(send_index: usize) -> (Self, Arc<Transcript>) {
            Self::build(Some(send_index), false)
        }

        pub(crate) fn short_writing() -> (Self, Arc<Transcript>) {
            Self::build(None, true)
        }

        fn build(fail_at: Option<usize>, short_writes: bool) -> (Self, Arc<Transcript>) {
            let transcript = Arc::new(Transcript::default());
            let session = Self {
                id: Uuid::new_v4(),
                transcript: Arc::clone(&transcript),
                fail_at,
                short_writes,
                sent: 0,
            };
            (session, transcript)
        }
    }

    impl Session for MockSession {
        fn id(&self) -> Uuid {
            self.id
        }

        async fn send_text(&mut self, text: &str) -> Result<usize, SessionError> {
            let index = self.sent;
            self.sent += 1;
            if self.fail_at == Some(index) {
                return Err(SessionError::Transport("connection reset".to_string()));
            }
            self.transcript.frames.lock().push(text.to_string());
            if self.short_writes {
                Ok(text.len().saturating_sub(1))
            } else {
                Ok(text.len())
            }
        }

        async fn close(&mut self) {
            *self.transcript.closed.lock() = true;
        }
    }
}
