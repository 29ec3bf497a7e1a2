//! Change channel: out-of-band invalidation signals keyed by store key.
//!
//! Writes that originate outside an adapter's own surface (another process sharing the Sled
//! database, a sync job, a test) are announced here. Adapters that watch a key reload
//! immediately, bypassing their freshness lease.

use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// One invalidation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
}

/// Cloneable handle to a broadcast of [`StoreChange`] events.
#[derive(Debug, Clone)]
pub struct ChangeChannel {
    tx: broadcast::Sender<StoreChange>,
}

impl ChangeChannel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Announces a change to `key`. Returns how many listeners received it.
    pub fn notify(&self, key: impl Into<String>) -> usize {
        self.tx
            .send(StoreChange { key: key.into() })
            .unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeChannel {
    fn default() -> Self {
        Self::new()
    }
}
