//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use thiserror::Error;

// == Cache Error Enum ==
/// Errors surfaced to callers of the cache manager.
///
/// Only fetch failures ever reach a caller. Storage failures are absorbed by
/// the persistent tier and never show up here.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The caller-supplied fetch failed and no cached copy could be served.
    ///
    /// The original error is kept intact so callers can downcast it.
    #[error("Fetch failed: {0}")]
    Fetch(Arc<anyhow::Error>),

    /// A deduplicated fetch stopped before producing a result (aborted or panicked)
    #[error("Fetch cancelled: {0}")]
    Cancelled(String),
}

impl CacheError {
    /// Wraps an arbitrary fetch error.
    pub fn fetch<E: Into<anyhow::Error>>(err: E) -> Self {
        CacheError::Fetch(Arc::new(err.into()))
    }

    /// Returns the underlying fetch error, if this is a fetch failure.
    pub fn fetch_error(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::Fetch(err) => Some(err),
            CacheError::Cancelled(_) => None,
        }
    }
}

// == Store Error Enum ==
/// Errors raised by a durable key/value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem or other I/O failure
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// == Result Type Aliases ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Result type for durable store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
