//! Per-Tool Result Cache
//!
//! Keeps the last saved state of each analysis tool for the lifetime of the
//! application session, so leaving a tool and coming back does not require a
//! new query. One store is created at bootstrap and shared by reference.
//!
//! Consumers attach once (reading the snapshot a single time) and afterwards
//! only write:
//!
//! ```rust,ignore
//! let slot = cache.attach(ToolId::new("fund-assistant"));
//! if let Some(previous) = slot.cached() {
//!     render(previous);
//! }
//! slot.save(new_state);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored snapshot and when it was written
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub value: V,
    pub saved_at: DateTime<Utc>,
}

/// In-memory, last-write-wins store keyed by tool
pub struct ToolCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> Default for ToolCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> ToolCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value written for `key`, or `None` if the tool has no state yet
    pub fn read(&self, key: &K) -> Option<V> {
        self.entry(key).map(|entry| entry.value)
    }

    /// Like [`read`](Self::read), with the write timestamp
    pub fn entry(&self, key: &K) -> Option<CacheEntry<V>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Replace the stored value for `key`; no merging with the previous value
    pub fn write(&self, key: K, value: V) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            CacheEntry {
                value,
                saved_at: Utc::now(),
            },
        );
    }

    pub fn contains(&self, key: &K) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach a consumer: the current snapshot is read now and never again
    pub fn attach(&self, key: K) -> ToolSlot<'_, K, V> {
        let cached = self.read(&key);
        ToolSlot {
            cache: self,
            key,
            cached,
        }
    }
}

/// A consumer's view of one tool's cache entry
pub struct ToolSlot<'a, K, V> {
    cache: &'a ToolCache<K, V>,
    key: K,
    cached: Option<V>,
}

impl<K, V> ToolSlot<'_, K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Snapshot as of attach time
    pub fn cached(&self) -> Option<&V> {
        self.cached.as_ref()
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn save(&self, value: V) {
        self.cache.write(self.key.clone(), value);
    }
}

/// Default state shape saved by a tool: its query, the result and any side lists
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolState {
    pub query: String,

    #[serde(default)]
    pub result: serde_json::Value,

    /// Ancillary lists (sources, watch candidates, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub auxiliary: BTreeMap<String, serde_json::Value>,

    /// Model that produced the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ToolState {
    pub fn new(query: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            query: query.into(),
            result,
            ..Default::default()
        }
    }

    pub fn with_auxiliary(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.auxiliary.insert(name.into(), value);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
