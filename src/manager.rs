//! Cache Manager
//!
//! Orchestrates the memory tier, the persistent tier, request deduplication
//! and network monitoring behind a single stale-while-revalidate lookup.
//!
//! # Lookup order
//! 1. Memory tier (fresh entries only)
//! 2. Persistent tier, promoting hits into memory
//! 3. Deduplicated fetch, written back to both tiers
//! 4. On fetch failure, any cached copy even if expired

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{Lookup, MemoryCache, MemoryStats, PersistentCache};
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheConfig, ResourceClass};
use crate::dedup::RequestDeduplicator;
use crate::error::{CacheError, Result};
use crate::network::{NetworkQuality, NetworkQualityMonitor};
use crate::store::DurableStore;

// == Fetch Options ==
/// Per-call knobs for [`CacheManager::get_or_fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Freshness window for a newly fetched value; `None` uses the configured default
    pub ttl: Option<Duration>,
    /// Skip both cache tiers and go straight to the fetch
    pub force_refresh: bool,
    /// Serve an expired cached copy if the fetch fails
    pub use_stale_while_revalidate: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            force_refresh: false,
            use_stale_while_revalidate: true,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options using the TTL of a resource class.
    pub fn for_class(class: ResourceClass) -> Self {
        Self::new().with_ttl(class.ttl())
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.use_stale_while_revalidate = enabled;
        self
    }
}

// == Stats ==
/// Diagnostic snapshot of a cache manager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheManagerStats {
    pub memory: MemoryStats,
    /// Memory fill level in percent
    pub memory_utilization: f64,
    pub network_quality: NetworkQuality,
    pub adaptive_timeout_ms: u64,
    /// Times an expired value was served because a fetch failed
    pub stale_served: u64,
    pub pending_requests: usize,
}

// == Cache Manager ==
/// Two-tier cache for values of type `V` fetched from a remote source.
///
/// Construct one per cache scope and share it through an `Arc`. Different
/// value types can share a [`DurableStore`] as long as each manager uses its
/// own key prefix.
pub struct CacheManager<V> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    memory: MemoryCache<V>,
    persistent: PersistentCache,
    dedup: RequestDeduplicator<V>,
    network: NetworkQualityMonitor,
    stale_served: AtomicU64,
}

impl<V> std::fmt::Debug for CacheManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("config", &self.config)
            .field("persistent", &self.persistent)
            .finish_non_exhaustive()
    }
}

impl<V> CacheManager<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates a manager over `store` using the system clock.
    pub fn new(config: CacheConfig, store: Arc<dyn DurableStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            memory: MemoryCache::with_clock(config.max_memory_entries, clock.clone()),
            persistent: PersistentCache::with_clock(store, config.key_prefix.clone(), clock.clone()),
            dedup: RequestDeduplicator::new(),
            network: NetworkQualityMonitor::new(config.network.clone()),
            stale_served: AtomicU64::new(0),
            clock,
            config,
        }
    }

    // == Get Or Fetch ==
    /// Returns the value for `key` from cache, or fetches it.
    ///
    /// Concurrent calls for the same key share a single invocation of
    /// `fetch`; only the first caller's closure runs. When the fetch fails and
    /// stale-while-revalidate is on, any cached copy is returned instead,
    /// expired or not. Otherwise the fetch error is returned as
    /// [`CacheError::Fetch`].
    ///
    /// Reading an expired entry removes it from both tiers, so an expired copy
    /// is served as fallback at most once. A second failed fetch for the same
    /// key returns the error.
    ///
    /// A persistent hit is copied into memory with its remaining TTL rather
    /// than `options.ttl`, so both copies expire together.
    ///
    /// The manager enforces no timeout; `fetch` should apply
    /// [`adaptive_timeout`](Self::adaptive_timeout) itself.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F, options: FetchOptions) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let ttl = options.ttl.unwrap_or(self.config.default_ttl);
        // An expired value seen on the way down, kept in case the fetch fails.
        let mut stale = None;

        if !options.force_refresh {
            match self.memory.lookup(key) {
                Lookup::Fresh(entry) => {
                    debug!(key, "memory hit");
                    return Ok(entry.data);
                }
                Lookup::Expired(entry) => stale = Some(entry.data),
                Lookup::Missing => {}
            }

            match self.persistent.lookup::<V>(key).await {
                Lookup::Fresh(entry) => {
                    debug!(key, "persistent hit");
                    let remaining = Duration::from_millis(entry.ttl_remaining_ms(self.clock.now_ms()));
                    self.memory.set(key, entry.data.clone(), remaining);
                    return Ok(entry.data);
                }
                Lookup::Expired(entry) => stale = stale.or(Some(entry.data)),
                Lookup::Missing => {}
            }
        }

        debug!(key, force_refresh = options.force_refresh, "fetching fresh data");
        let started = Instant::now();
        let outcome = self
            .dedup
            .deduplicate(key, move || {
                let request = fetch();
                async move { request.await.map_err(CacheError::fetch) }
            })
            .await;

        match outcome {
            Ok(value) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                self.network.record_response_time(elapsed_ms);

                self.memory.set(key, value.clone(), ttl);
                self.persistent.set(key, &value, ttl).await;

                debug!(key, elapsed_ms, "fetched and cached");
                Ok(value)
            }
            Err(err) => {
                warn!(key, error = %err, "fetch failed");

                if options.use_stale_while_revalidate {
                    if let Some(value) = self.stale_value(key, stale).await {
                        info!(key, "serving stale data after failed fetch");
                        self.stale_served.fetch_add(1, Ordering::Relaxed);
                        return Ok(value);
                    }
                }
                Err(err)
            }
        }
    }

    /// Any cached copy for `key`, ignoring expiry.
    async fn stale_value(&self, key: &str, seen: Option<V>) -> Option<V> {
        if seen.is_some() {
            return seen;
        }
        if let Some(entry) = self.memory.peek(key) {
            return Some(entry.data);
        }
        self.persistent.peek::<V>(key).await.map(|entry| entry.data)
    }

    // == Invalidate ==
    /// Drops `key` from both tiers. Absent keys are ignored.
    pub async fn invalidate(&self, key: &str) {
        self.memory.delete(key);
        self.persistent.delete(key).await;
        debug!(key, "invalidated");
    }

    /// Drops every entry in both tiers and forgets in-flight registrations.
    pub async fn invalidate_all(&self) {
        self.memory.clear();
        let removed = self.persistent.clear().await;
        self.dedup.clear();
        info!(persistent_removed = removed, "invalidated all cache entries");
    }

    // == Prefetch ==
    /// Fetches `key` unconditionally and stores the result in both tiers.
    ///
    /// Best effort: failures are logged and swallowed.
    pub async fn prefetch<F, Fut, E>(&self, key: &str, fetch: F, ttl: Duration)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: Into<anyhow::Error>,
    {
        debug!(key, "prefetching");
        match fetch().await {
            Ok(value) => {
                self.memory.set(key, value.clone(), ttl);
                self.persistent.set(key, &value, ttl).await;
                debug!(key, "prefetched");
            }
            Err(err) => {
                let err: anyhow::Error = err.into();
                warn!(key, error = %err, "prefetch failed");
            }
        }
    }

    // == Diagnostics ==
    /// Timeout a fetch should use given current network conditions.
    pub fn adaptive_timeout(&self) -> Duration {
        self.network.timeout()
    }

    pub fn network_quality(&self) -> NetworkQuality {
        self.network.quality()
    }

    pub fn network(&self) -> &NetworkQualityMonitor {
        &self.network
    }

    pub fn stats(&self) -> CacheManagerStats {
        let memory = self.memory.stats();
        let quality = self.network.quality();
        CacheManagerStats {
            memory_utilization: memory.utilization(),
            memory,
            network_quality: quality,
            adaptive_timeout_ms: self.network.timeout_for(quality).as_millis() as u64,
            stale_served: self.stale_served.load(Ordering::Relaxed),
            pending_requests: self.dedup.pending_count(),
        }
    }

    /// Removes expired entries from the memory tier.
    ///
    /// The persistent tier keeps its copies, so stale fallback still works
    /// for keys purged here.
    pub fn purge_expired(&self) -> usize {
        self.memory.purge_expired()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

// == Cache Keys ==
/// Builds a cache key from an endpoint and its request parameters.
///
/// Parameters are appended as JSON; empty or null parameters leave the
/// endpoint alone. Use ordered maps (or structs) so equal parameter sets
/// produce equal keys.
pub fn cache_key<P: Serialize + ?Sized>(endpoint: &str, params: &P) -> String {
    let value = match serde_json::to_value(params) {
        Ok(value) => value,
        Err(err) => {
            warn!(endpoint, error = %err, "cache key parameters are not serializable");
            return endpoint.to_string();
        }
    };

    let is_empty = match &value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    };

    if is_empty {
        endpoint.to_string()
    } else {
        format!("{endpoint}{value}")
    }
}
