//! Persistent Cache Module
//!
//! Durable tier that serializes entries through a [`DurableStore`] under a
//! fixed key prefix. Store failures are logged and absorbed: a failed read is
//! a miss, a failed write or delete is a no-op.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::entry::expiry_ms;
use crate::cache::{CacheEntry, Lookup};
use crate::clock::{Clock, SystemClock};
use crate::store::DurableStore;

/// On-disk shape of an entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedEntry<T> {
    data: T,
    timestamp: u64,
    expires_at: u64,
}

impl<T> From<PersistedEntry<T>> for CacheEntry<T> {
    fn from(entry: PersistedEntry<T>) -> Self {
        CacheEntry {
            data: entry.data,
            timestamp: entry.timestamp,
            ttl: Duration::from_millis(entry.expires_at.saturating_sub(entry.timestamp)),
            expires_at: entry.expires_at,
        }
    }
}

// == Persistent Cache ==
/// Cache tier that survives restarts.
///
/// Entries have no count limit here; capacity is the store's concern.
pub struct PersistentCache {
    store: Arc<dyn DurableStore>,
    prefix: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PersistentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl PersistentCache {
    pub fn new(store: Arc<dyn DurableStore>, prefix: impl Into<String>) -> Self {
        Self::with_clock(store, prefix, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn DurableStore>,
        prefix: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            clock,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn store_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    // == Set ==
    /// Serializes and writes a value that stays fresh for `ttl`.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let now = self.clock.now_ms();
        let entry = PersistedEntry {
            data: value,
            timestamp: now,
            expires_at: expiry_ms(now, ttl),
        };

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %err, "persistent cache failed to serialize entry");
                return;
            }
        };

        match self.store.set(&self.store_key(key), &raw).await {
            Ok(()) => debug!(key, "persistent cache stored entry"),
            Err(err) => warn!(key, error = %err, "persistent cache failed to store entry"),
        }
    }

    // == Peek ==
    /// Reads the entry whatever its freshness. Never deletes.
    pub async fn peek<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = match self.store.get(&self.store_key(key)).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(key, error = %err, "persistent cache failed to read entry");
                return None;
            }
        };

        match serde_json::from_str::<PersistedEntry<T>>(&raw) {
            Ok(entry) => Some(entry.into()),
            Err(err) => {
                warn!(key, error = %err, "persistent cache found an unreadable entry");
                None
            }
        }
    }

    // == Lookup ==
    /// Reads a key, deleting it if expired and handing the expired entry back.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        let Some(entry) = self.peek::<T>(key).await else {
            debug!(key, "persistent cache miss");
            return Lookup::Missing;
        };

        if entry.is_expired(self.clock.now_ms()) {
            debug!(key, "persistent cache entry expired");
            self.delete(key).await;
            return Lookup::Expired(entry);
        }

        debug!(key, "persistent cache hit");
        Lookup::Fresh(entry)
    }

    // == Get ==
    /// Returns the value if present and fresh.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.lookup(key).await.fresh()
    }

    // == Delete ==
    pub async fn delete(&self, key: &str) {
        match self.store.delete(&self.store_key(key)).await {
            Ok(()) => debug!(key, "persistent cache deleted entry"),
            Err(err) => warn!(key, error = %err, "persistent cache failed to delete entry"),
        }
    }

    // == Clear ==
    /// Deletes every key under this cache's prefix, leaving other keys in the
    /// store alone. Returns the number of entries removed.
    ///
    /// Matching is by plain string prefix, so caches sharing a store must use
    /// prefixes where neither is a prefix of the other (`api_` would also
    /// clear everything under `api_cache_`).
    pub async fn clear(&self) -> usize {
        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "persistent cache failed to list keys for clear");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys.iter().filter(|key| key.starts_with(&self.prefix)) {
            match self.store.delete(key).await {
                Ok(()) => removed += 1,
                Err(err) => warn!(key = %key, error = %err, "persistent cache failed to clear entry"),
            }
        }
        debug!(removed, "persistent cache cleared");
        removed
    }
}
