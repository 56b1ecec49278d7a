//! Memory Cache Module
//!
//! Bounded in-process tier combining HashMap storage with LRU tracking and
//! lazy TTL expiration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheEntry, LruTracker, Lookup, MemoryStats};
use crate::clock::{Clock, SystemClock};

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    lru: LruTracker,
    stats: MemoryStats,
}

// == Memory Cache ==
/// In-memory tier with LRU eviction and TTL support.
///
/// All operations are synchronous and infallible. The lock is never held
/// across an await point, so the cache can be shared freely between tasks.
#[derive(Debug)]
pub struct MemoryCache<V> {
    inner: Mutex<Inner<V>>,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> MemoryCache<V> {
    /// Creates a cache holding at most `max_entries` entries, using the system clock.
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                lru: LruTracker::new(),
                stats: MemoryStats::new(max_entries),
            }),
            max_entries,
            clock,
        }
    }

    // == Set ==
    /// Stores a value that stays fresh for `ttl`.
    ///
    /// Overwriting an existing key never evicts. Inserting a new key into a
    /// full cache first evicts the least recently used entry. A cache with
    /// zero capacity stores nothing.
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        if self.max_entries == 0 {
            return;
        }

        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.max_entries {
            if let Some(evicted) = inner.lru.evict_oldest() {
                inner.entries.remove(&evicted);
                inner.stats.record_eviction();
                debug!(key = %evicted, "memory cache evicted least recently used entry");
            }
        }

        inner
            .entries
            .insert(key.to_string(), CacheEntry::new(value, ttl, now));
        inner.lru.touch(key);
        let size = inner.entries.len();
        inner.stats.set_size(size);

        debug!(key, ttl_ms = ttl.as_millis() as u64, "memory cache stored entry");
    }

    // == Lookup ==
    /// Reads a key, telling fresh, expired and missing apart.
    ///
    /// A fresh hit refreshes the key's recency. An expired entry is removed
    /// and returned inside [`Lookup::Expired`].
    pub fn lookup(&self, key: &str) -> Lookup<V> {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key).map(|entry| entry.is_expired(now)) {
            None => {
                inner.stats.record_miss();
                return Lookup::Missing;
            }
            Some(expired) => expired,
        };

        if expired {
            let entry = inner.entries.remove(key);
            inner.lru.remove(key);
            let size = inner.entries.len();
            inner.stats.set_size(size);
            inner.stats.record_expiration();
            inner.stats.record_miss();
            debug!(key, "memory cache entry expired");
            return match entry {
                Some(entry) => Lookup::Expired(entry),
                None => Lookup::Missing,
            };
        }

        inner.lru.touch(key);
        inner.stats.record_hit();
        match inner.entries.get(key) {
            Some(entry) => Lookup::Fresh(entry.clone()),
            None => Lookup::Missing,
        }
    }

    // == Get ==
    /// Returns the value if present and fresh.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lookup(key).fresh()
    }

    // == Has ==
    /// Checks freshness without touching recency or stats.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        match inner.entries.get(key).map(|entry| entry.is_expired(now)) {
            None => false,
            Some(false) => true,
            Some(true) => {
                inner.entries.remove(key);
                inner.lru.remove(key);
                let size = inner.entries.len();
                inner.stats.set_size(size);
                inner.stats.record_expiration();
                false
            }
        }
    }

    // == Peek ==
    /// Returns the entry whatever its freshness, without touching recency.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<V>> {
        self.inner.lock().entries.get(key).cloned()
    }

    // == Delete ==
    /// Removes an entry. Absent keys are ignored.
    pub fn delete(&self, key: &str) {
        let mut inner = self.inner.lock();
        if inner.entries.remove(key).is_some() {
            debug!(key, "memory cache deleted entry");
        }
        inner.lru.remove(key);
        let size = inner.entries.len();
        inner.stats.set_size(size);
    }

    // == Clear ==
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let size = inner.entries.len();
        inner.entries.clear();
        inner.lru.clear();
        inner.stats.set_size(0);
        debug!(size, "memory cache cleared");
    }

    // == Purge Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.inner.lock();

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.remove(key);
            inner.lru.remove(key);
            inner.stats.record_expiration();
        }
        let size = inner.entries.len();
        inner.stats.set_size(size);

        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn stats(&self) -> MemoryStats {
        self.inner.lock().stats.clone()
    }
}
