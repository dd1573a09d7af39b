//! Lossless channel carrying state-change notifications.
//!
//! [`ChangeBus`] fans every [`StateChange`] out to one bounded
//! [`tokio::sync::mpsc`] queue per subscriber. The state owner publishes
//! after every mutation and never calls into the server directly; each
//! running server subscribes once and forwards what it receives to its
//! WebSocket sessions.
//!
//! A full queue makes the publisher wait instead of overwriting older
//! changes, so a subscriber sees every change in publish order.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// One state-change notification.
///
/// The snapshot is shared read-only with every subscriber. Dropping the
/// last clone releases it back to the owner.
#[derive(Debug, Clone)]
pub struct StateChange {
    snapshot: Arc<serde_json::Value>,
}

impl StateChange {
    /// Wraps a snapshot document.
    #[must_use]
    pub fn new(snapshot: serde_json::Value) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }

    /// Borrows the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &serde_json::Value {
        &self.snapshot
    }

    /// Number of notifications still holding this snapshot.
    #[must_use]
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.snapshot)
    }
}

#[derive(Debug)]
struct Inner {
    capacity: usize,
    subscribers: Mutex<Vec<mpsc::Sender<StateChange>>>,
    // Serializes publishers so every subscriber observes the same order.
    publishing: tokio::sync::Mutex<()>,
}

/// Fan-out bus for [`StateChange`]s.
///
/// Each subscriber owns a queue of fixed capacity. Clones share the same
/// subscriber set; once every clone is dropped, receivers see the end of
/// the stream.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    inner: Arc<Inner>,
}

impl ChangeBus {
    /// Creates a new `ChangeBus` whose subscriber queues hold `capacity`
    /// changes each.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: capacity.max(1),
                subscribers: Mutex::new(Vec::new()),
                publishing: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Publishes a change to all subscribers, waiting while a subscriber's
    /// queue is full.
    ///
    /// Returns the number of subscribers that got the change. Subscribers
    /// whose receiver is gone are forgotten. With no running server the
    /// change is dropped.
    pub async fn publish(&self, change: StateChange) -> usize {
        let _order = self.inner.publishing.lock().await;
        let subscribers = self.inner.subscribers.lock().clone();

        let mut delivered = 0;
        for subscriber in &subscribers {
            if subscriber.send(change.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        if delivered < subscribers.len() {
            self.inner
                .subscribers
                .lock()
                .retain(|subscriber| !subscriber.is_closed());
        }
        delivered
    }

    /// Creates a new receiver for all future changes.
    #[must_use]
    pub fn subscribe(&self) -> mpsc::Receiver<StateChange> {
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        self.inner.subscribers.lock().push(sender);
        receiver
    }

    /// Returns the current number of live receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .iter()
            .filter(|subscriber| !subscriber.is_closed())
            .count()
    }
}
