//! Persistent key-value store port.
//!
//! The store is a black box to the core: `get`, `set`, `remove`, plus the out-of-band change
//! notification carried by [`ChangeChannel`]. Values are JSON documents.
//!
//! | Implementation | Backing          | Change notifications                         |
//! |----------------|------------------|----------------------------------------------|
//! | [`SledStore`]  | Sled tree        | `forward_changes` bridges `watch_prefix`      |
//! | [`MemoryStore`]| `DashMap`        | optional: emits on every `set_raw` / `remove` |

use super::change::ChangeChannel;
use crate::error::StoreError;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const DEFAULT_PATH: &str = "./data/pulse_store";

/// Sled tree holding every mini-app's keys.
const APPS_TREE: &str = "pulse_apps";

pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set_raw(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Removes `key`. Returns `true` if a value was present.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// All keys currently stored. Order is not guaranteed.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Typed JSON helpers over any [`KeyValueStore`].
pub trait StoreExt: KeyValueStore {
    /// Decodes the value at `key`. Missing → `Ok(None)`; undecodable → [`StoreError::Corrupt`].
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_raw(key)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StoreError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    /// `get(key, default)`: the decoded value, or `default` when the key is absent.
    fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        Ok(self.get_json(key)?.unwrap_or(default))
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set_raw(key, &bytes)
    }
}

impl<S: KeyValueStore + ?Sized> StoreExt for S {}

/// Sled-backed store. One tree (`pulse_apps`) shared by every adapter; keys are namespaced
/// by the adapters themselves (`notes`, `focus.state`, `gallery.cats.favorites`, ...).
pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Opens or creates the store at `./data/pulse_store`.
    pub fn new() -> Result<Self, StoreError> {
        Self::open_path(DEFAULT_PATH)
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory Sled instance removed on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let tree = db.open_tree(APPS_TREE)?;
        Ok(Self { db, tree })
    }

    /// Flushes dirty buffers to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Bridges Sled's change feed into `channel`, so writes made through any handle to this
    /// database (including other tasks) invalidate watching adapters.
    ///
    /// Must be called from within a Tokio runtime. Abort the returned handle to stop forwarding.
    pub fn forward_changes(&self, channel: ChangeChannel) -> tokio::task::JoinHandle<()> {
        let mut subscriber = self.tree.watch_prefix(Vec::<u8>::new());
        tokio::spawn(async move {
            while let Some(event) = (&mut subscriber).await {
                let key = match &event {
                    sled::Event::Insert { key, .. } => key,
                    sled::Event::Remove { key } => key,
                };
                let key = String::from_utf8_lossy(key).into_owned();
                let delivered = channel.notify(key.clone());
                tracing::debug!(
                    target: "pulse::store",
                    key = %key,
                    listeners = delivered,
                    "store change forwarded"
                );
            }
        })
    }
}

impl KeyValueStore for SledStore {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tree.get(key.as_bytes())?.map(|iv| iv.to_vec()))
    }

    fn set_raw(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let prev = self.tree.insert(key.as_bytes(), value)?;
        tracing::debug!(
            target: "pulse::store",
            key = key,
            bytes = value.len(),
            action = if prev.is_some() { "UPDATE" } else { "INSERT" },
            "store write"
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let prev = self.tree.remove(key.as_bytes())?;
        if prev.is_some() {
            tracing::debug!(target: "pulse::store", key = key, action = "REMOVE", "store remove");
        }
        Ok(prev.is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut out = Vec::new();
        for key in self.tree.iter().keys() {
            out.push(String::from_utf8_lossy(&key?).into_owned());
        }
        Ok(out)
    }
}

/// `DashMap`-backed store for tests and demos.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Vec<u8>>,
    changes: Option<ChangeChannel>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write through this store is also announced on `channel`.
    pub fn with_change_channel(channel: ChangeChannel) -> Self {
        Self {
            entries: DashMap::new(),
            changes: Some(channel),
        }
    }

    /// Stores raw bytes verbatim (used to plant corrupt payloads in tests).
    pub fn put_bytes(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.to_string(), value.into());
        self.announce(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn announce(&self, key: &str) {
        if let Some(channel) = &self.changes {
            channel.notify(key);
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set_raw(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_vec());
        self.announce(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.announce(key);
        }
        Ok(removed)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.iter().map(|e| e.key().clone()).collect())
    }
}
