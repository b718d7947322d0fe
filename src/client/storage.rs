//! Shared Persistent Store
//!
//! Models the per-origin key-value store every open tab of the planner shares.
//! A write from one tab raises a [`StorageEvent`] in every *other* tab; the
//! writing tab never sees its own write, the same way browser storage events
//! exclude the document that made the change.

use crate::shared::error::SyncError;
use crate::shared::lock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

/// Identity of one tab sharing the store
pub type TabId = Uuid;

/// Where a storage event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOrigin {
    /// A genuine write made by another tab
    OtherTab(TabId),
    /// Raised locally to mimic a cross-tab write
    Synthetic,
}

/// A storage-mutation signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Mutated key; `None` when the whole store was cleared
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub origin: StorageOrigin,
}

impl StorageEvent {
    /// Event raised by `trigger_update`-style callers after a local write
    pub fn synthetic(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            old_value: None,
            new_value: None,
            origin: StorageOrigin::Synthetic,
        }
    }

    /// Whether this event affects `key`; a clear affects every key
    pub fn concerns(&self, key: &str) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == StorageOrigin::Synthetic
    }
}

struct StorageInner {
    values: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<(TabId, StorageEvent)>,
    quota: Option<usize>,
}

/// The store shared by every tab of one origin
#[derive(Clone)]
pub struct LocalStorage {
    inner: Arc<StorageInner>,
}

impl fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStorage")
            .field("keys", &self.values().len())
            .finish()
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStorage {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Store refusing writes that would grow it past `bytes` (keys plus values)
    pub fn with_quota(bytes: usize) -> Self {
        Self::build(Some(bytes))
    }

    fn build(quota: Option<usize>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(StorageInner {
                values: Mutex::new(HashMap::new()),
                events,
                quota,
            }),
        }
    }

    /// Open a handle for a new tab
    pub fn open_tab(&self) -> StorageTab {
        StorageTab {
            id: Uuid::new_v4(),
            storage: self.clone(),
        }
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        lock(&self.inner.values)
    }

    fn announce(
        &self,
        writer: TabId,
        key: Option<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        let event = StorageEvent {
            key,
            old_value,
            new_value,
            origin: StorageOrigin::OtherTab(writer),
        };
        // no receivers means no other tab is listening
        let _ = self.inner.events.send((writer, event));
    }
}

/// One tab's view of the shared store
#[derive(Clone)]
pub struct StorageTab {
    id: TabId,
    storage: LocalStorage,
}

impl fmt::Debug for StorageTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageTab").field("id", &self.id).finish()
    }
}

impl StorageTab {
    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.storage.values().get(key).cloned()
    }

    /// Store a value, logging a rejected write
    pub fn set(&self, key: &str, value: impl Into<String>) {
        if let Err(e) = self.try_set(key, value) {
            tracing::warn!("[XTAB] {}", e);
        }
    }

    /// Store a value; other tabs are told only if it actually changed
    pub fn try_set(&self, key: &str, value: impl Into<String>) -> Result<(), SyncError> {
        let value = value.into();
        let old = {
            let mut values = self.storage.values();
            if let Some(quota) = self.storage.inner.quota {
                let current: usize = values
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                let needed = current + key.len() + value.len();
                if needed > quota {
                    return Err(SyncError::storage(format!(
                        "writing '{}' needs {} bytes, quota is {}",
                        key, needed, quota
                    )));
                }
            }
            values.insert(key.to_string(), value.clone())
        };
        if old.as_deref() != Some(value.as_str()) {
            self.storage
                .announce(self.id, Some(key.to_string()), old, Some(value));
        }
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        let old = self.storage.values().remove(key);
        if old.is_some() {
            self.storage.announce(self.id, Some(key.to_string()), old, None);
        }
    }

    pub fn clear(&self) {
        let had_values = {
            let mut values = self.storage.values();
            let had_values = !values.is_empty();
            values.clear();
            had_values
        };
        if had_values {
            self.storage.announce(self.id, None, None, None);
        }
    }

    /// Decode the JSON value stored under `key`
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SyncError> {
        self.get(key)
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(SyncError::from)
    }

    /// Encode `value` as JSON under `key`
    pub fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SyncError> {
        let raw = serde_json::to_string(value)?;
        self.try_set(key, raw)
    }

    /// Storage events raised by other tabs from now on
    pub fn subscribe(&self) -> TabEvents {
        TabEvents {
            tab: self.id,
            receiver: self.storage.inner.events.subscribe(),
        }
    }
}

/// Receiver of storage events addressed to one tab
#[derive(Debug)]
pub struct TabEvents {
    tab: TabId,
    receiver: broadcast::Receiver<(TabId, StorageEvent)>,
}

impl TabEvents {
    /// Next event written by another tab
    pub async fn recv(&mut self) -> Result<StorageEvent, broadcast::error::RecvError> {
        loop {
            let (writer, event) = self.receiver.recv().await?;
            if writer != self.tab {
                return Ok(event);
            }
        }
    }
}
