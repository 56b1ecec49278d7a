//! Durable Store Module
//!
//! Async key/value persistence used by the persistent cache tier.
//!
//! # Backends
//! - [`MemoryStore`]: process-lifetime map, for tests and ephemeral setups
//! - [`FileStore`]: one file per key under a directory

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::StoreResult;

pub use file::FileStore;
pub use memory::MemoryStore;

/// A durable string key/value store.
///
/// The store is shared with the rest of an application, so implementations
/// must tolerate unrelated keys living next to the cache's own namespace.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Reads a value. A missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes a key. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Lists every key currently held.
    async fn keys(&self) -> StoreResult<Vec<String>>;
}
