//! Fitcache - an adaptive data-access cache for remote APIs
//!
//! Two cache tiers (bounded in-memory LRU and a durable key/value store),
//! request deduplication, stale-while-revalidate fallback and network-aware
//! timeouts, all behind [`CacheManager::get_or_fetch`].

pub mod cache;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod manager;
pub mod network;
pub mod store;
pub mod tasks;

pub use cache::{CacheEntry, MemoryCache, MemoryStats, PersistentCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, NetworkConfig, ResourceClass};
pub use dedup::RequestDeduplicator;
pub use error::{CacheError, Result, StoreError};
pub use manager::{cache_key, CacheManager, CacheManagerStats, FetchOptions};
pub use network::{NetworkQuality, NetworkQualityMonitor};
pub use store::{DurableStore, FileStore, MemoryStore};
pub use tasks::spawn_cleanup_task;
