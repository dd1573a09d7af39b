//! In-memory state owner for the current block.
//!
//! [`StatusStore`] holds the configuration document shown to every new
//! client and the ordered entries recorded for the block being mined.
//! Each mutation publishes a [`StateChange`] on the [`ChangeBus`]; the
//! server replays the stored entries to late joiners through
//! [`ReplayProvider`].

use parking_lot::RwLock;

use super::change_bus::{ChangeBus, StateChange};

/// Source of the documents replayed to a session on connect.
///
/// Implemented by whatever owns the authoritative mining state.
pub trait ReplayProvider: Send + Sync {
    /// The configuration document sent first to every new session.
    fn configuration(&self) -> serde_json::Value;

    /// Entries of the live state in stored order, or `None` when the owner
    /// currently holds no live state.
    fn history(&self) -> Option<Vec<serde_json::Value>>;
}

/// Reference state owner backed by a lock-protected entry list.
#[derive(Debug)]
pub struct StatusStore {
    configuration: RwLock<serde_json::Value>,
    block: RwLock<Option<Vec<serde_json::Value>>>,
    bus: ChangeBus,
}

impl StatusStore {
    /// Creates a store with no live block.
    #[must_use]
    pub fn new(configuration: serde_json::Value, bus: ChangeBus) -> Self {
        Self {
            configuration: RwLock::new(configuration),
            block: RwLock::new(None),
            bus,
        }
    }

    /// Returns the bus this store publishes on.
    #[must_use]
    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    /// Replaces the configuration document sent to new sessions.
    pub fn set_configuration(&self, configuration: serde_json::Value) {
        *self.configuration.write() = configuration;
    }

    /// Starts a new block whose first entry is `block_info`, discarding the
    /// previous block's entries.
    ///
    /// Returns the number of subscribers notified. Waits while a running
    /// server's change queue is full.
    pub async fn begin_block(&self, block_info: serde_json::Value) -> usize {
        *self.block.write() = Some(vec![block_info.clone()]);
        self.bus.publish(StateChange::new(block_info)).await
    }

    /// Appends an entry to the live block and publishes it. Starts a block
    /// if none is live.
    ///
    /// Returns the number of subscribers notified.
    pub async fn add_entry(&self, entry: serde_json::Value) -> usize {
        self.block
            .write()
            .get_or_insert_with(Vec::new)
            .push(entry.clone());
        self.bus.publish(StateChange::new(entry)).await
    }

    /// Drops the live block.
    pub fn clear(&self) {
        *self.block.write() = None;
    }

    /// Returns the number of entries in the live block.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.block.read().as_ref().map_or(0, Vec::len)
    }
}

impl ReplayProvider for StatusStore {
    fn configuration(&self) -> serde_json::Value {
        self.configuration.read().clone()
    }

    fn history(&self) -> Option<Vec<serde_json::Value>> {
        self.block.read().clone()
    }
}
