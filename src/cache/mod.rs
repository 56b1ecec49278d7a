//! Cache Module
//!
//! The two cache tiers: a bounded in-memory LRU tier and a durable tier
//! backed by a key/value store. Both expire entries lazily on read.

mod entry;
mod lru;
mod memory;
mod persistent;
mod stats;


// Re-export public types
pub use entry::{CacheEntry, Lookup};
pub use lru::LruTracker;
pub use memory::MemoryCache;
pub use persistent::PersistentCache;
pub use stats::MemoryStats;
