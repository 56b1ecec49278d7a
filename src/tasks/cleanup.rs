//! Expired Entry Sweep
//!
//! Background task that periodically drops expired entries from the memory
//! tier. Expiry is enforced lazily on read anyway; the sweep only frees memory
//! held by keys nobody asks for again.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::manager::CacheManager;

/// Spawns a background task that purges expired memory entries every `interval`.
///
/// The returned handle should be aborted on shutdown.
///
/// # Example
/// ```ignore
/// let manager = Arc::new(CacheManager::<Vec<Exercise>>::new(config, store));
/// let sweep = spawn_cleanup_task(manager.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweep.abort();
/// ```
pub fn spawn_cleanup_task<V>(manager: Arc<CacheManager<V>>, interval: Duration) -> JoinHandle<()>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting cache sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = manager.purge_expired();
            if removed > 0 {
                info!(removed, "cache sweep removed expired entries");
            } else {
                debug!("cache sweep found no expired entries");
            }
        }
    })
}

/// Starts the sweep if the manager's configuration asks for one.
pub fn spawn_configured_cleanup<V>(manager: &Arc<CacheManager<V>>) -> Option<JoinHandle<()>>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    let interval = manager.config().cleanup_interval?;
    Some(spawn_cleanup_task(manager.clone(), interval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::CacheConfig;
    use crate::manager::FetchOptions;
    use crate::store::MemoryStore;

    fn manager(config: CacheConfig) -> (Arc<CacheManager<String>>, ManualClock) {
        let clock = ManualClock::new(0);
        let manager = CacheManager::with_clock(config, Arc::new(MemoryStore::new()), Arc::new(clock.clone()));
        (Arc::new(manager), clock)
    }

    async fn fill(manager: &CacheManager<String>, key: &str, ttl_ms: u64) {
        manager
            .get_or_fetch(
                key,
                || async { Ok::<_, anyhow::Error>("value".to_string()) },
                FetchOptions::new().with_ttl(Duration::from_millis(ttl_ms)),
            )
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let (manager, clock) = manager(CacheConfig::default());
        fill(&manager, "expire_soon", 1_000).await;
        fill(&manager, "long_lived", 3_600_000).await;

        let handle = spawn_cleanup_task(manager.clone(), Duration::from_secs(1));

        clock.advance(2_000);
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        let stats = manager.stats();
        assert_eq!(stats.memory.size, 1, "only the long-lived entry remains");
        assert_eq!(stats.memory.expirations, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let (manager, _) = manager(CacheConfig::default());

        let handle = spawn_cleanup_task(manager, Duration::from_secs(1));
        handle.abort();

        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled(), "Task should be cancelled after abort");
    }

    #[tokio::test]
    async fn test_configured_cleanup() {
        let (disabled, _) = manager(CacheConfig::default());
        assert!(spawn_configured_cleanup(&disabled).is_none());

        let (enabled, _) = manager(CacheConfig {
            cleanup_interval: Some(Duration::from_secs(5)),
            ..CacheConfig::default()
        });
        let handle = spawn_configured_cleanup(&enabled).unwrap();
        handle.abort();
    }
}
