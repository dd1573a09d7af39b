//! Serialized documents pushed to WebSocket sessions.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// An immutable, already-serialized JSON document.
///
/// Serialized once and shared by reference count, so a broadcast costs one
/// encoding regardless of how many sessions receive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastMessage(Arc<str>);

impl BroadcastMessage {
    /// Serializes `value` into a new message.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `value` cannot be encoded.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(Self::from)
    }

    /// Returns the document text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the document length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the document is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for BroadcastMessage {
    fn from(text: String) -> Self {
        Self(Arc::from(text))
    }
}

impl From<&str> for BroadcastMessage {
    fn from(text: &str) -> Self {
        Self(Arc::from(text))
    }
}

impl fmt::Display for BroadcastMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
