//! Request Deduplication
//!
//! Coalesces concurrent fetches for the same key into one underlying
//! operation. The operation runs as its own task and unregisters itself as
//! soon as it settles, so a later request always starts a fresh fetch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{CacheError, Result};

type Outcome<V> = Result<V>;
type PendingChannel<V> = Shared<oneshot::Receiver<Outcome<V>>>;
type PendingMap<V> = Arc<Mutex<HashMap<String, (u64, PendingChannel<V>)>>>;

/// Removes a registration when dropped, so a panicking operation cannot
/// leave its key stuck in the registry.
struct Unregister<V> {
    pending: PendingMap<V>,
    key: String,
    id: u64,
}

impl<V> Drop for Unregister<V> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock();
        // `clear` may have let a newer run take the key in the meantime.
        if pending.get(&self.key).is_some_and(|(id, _)| *id == self.id) {
            pending.remove(&self.key);
        }
    }
}

// == Request Deduplicator ==
/// Registry of in-flight operations keyed by cache key.
pub struct RequestDeduplicator<V> {
    pending: PendingMap<V>,
    /// Distinguishes registrations for the same key across `clear` calls
    next_id: AtomicU64,
}

impl<V> std::fmt::Debug for RequestDeduplicator<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduplicator")
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

impl<V> Default for RequestDeduplicator<V> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<V> RequestDeduplicator<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    // == Deduplicate ==
    /// Runs `operation` for `key`, or joins the run already in flight.
    ///
    /// `operation` is only invoked when nothing is pending for `key`. Every
    /// caller joined to the same run observes the same value or error. The
    /// registration is removed before the outcome is delivered.
    pub async fn deduplicate<F, Fut>(&self, key: &str, operation: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let channel = self.join_or_start(key, operation);

        match channel.await {
            Ok(outcome) => outcome,
            Err(_) => Err(CacheError::Cancelled(key.to_string())),
        }
    }

    fn join_or_start<F, Fut>(&self, key: &str, operation: F) -> PendingChannel<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (id, sender, channel) = {
            let mut pending = self.pending.lock();
            if let Some((_, channel)) = pending.get(key) {
                debug!(key, "joining pending request");
                return channel.clone();
            }

            debug!(key, "starting new request");
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let (sender, receiver) = oneshot::channel();
            let channel = receiver.shared();
            pending.insert(key.to_string(), (id, channel.clone()));
            (id, sender, channel)
        };

        // `operation` runs without the registry lock. If it panics, the guard
        // drops before `sender`, so the key is free before waiters see `Cancelled`.
        let unregister = Unregister {
            pending: self.pending.clone(),
            key: key.to_string(),
            id,
        };
        let operation = operation();

        tokio::spawn(async move {
            let outcome = operation.await;
            drop(unregister);
            sender.send(outcome).ok();
        });

        channel
    }

    /// Whether an operation for `key` is currently in flight.
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.lock().contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    // == Clear ==
    /// Forgets every registration.
    ///
    /// Running operations still deliver to the callers already waiting on
    /// them, but new callers start fresh runs.
    pub fn clear(&self) {
        let mut pending = self.pending.lock();
        let count = pending.len();
        pending.clear();
        debug!(count, "cleared pending requests");
    }
}
