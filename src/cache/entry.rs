//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

// == Cache Entry ==
/// A cached value and its freshness metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub data: V,
    /// Creation timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Freshness window the entry was written with
    pub ttl: Duration,
    /// Expiration timestamp (Unix milliseconds), fixed at write time
    pub expires_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry written at `now_ms` that stays fresh for `ttl`.
    pub fn new(data: V, ttl: Duration, now_ms: u64) -> Self {
        Self {
            data,
            timestamp: now_ms,
            ttl,
            expires_at: expiry_ms(now_ms, ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: an entry is expired once `now_ms >= expires_at`, so a
    /// zero TTL yields an entry that is never served fresh.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Remaining freshness in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }
}

/// Expiry timestamp for an entry written at `now_ms`, saturating at `u64::MAX`.
pub(crate) fn expiry_ms(now_ms: u64, ttl: Duration) -> u64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    now_ms.saturating_add(ttl_ms)
}

// == Lookup ==
/// Outcome of reading a key from a cache tier.
///
/// `Expired` hands back the entry that was just lazily removed, so the caller
/// can keep it around as a last-resort fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    Fresh(CacheEntry<V>),
    Expired(CacheEntry<V>),
    Missing,
}

impl<V> Lookup<V> {
    /// The value if it was fresh.
    pub fn fresh(self) -> Option<V> {
        match self {
            Lookup::Fresh(entry) => Some(entry.data),
            _ => None,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("test_value", Duration::from_millis(1000), 0);

        assert_eq!(entry.data, "test_value");
        assert_eq!(entry.timestamp, 0);
        assert_eq!(entry.expires_at, 1000);
        assert!(!entry.is_expired(0));
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new("test_value", Duration::from_millis(1000), 0);

        assert!(!entry.is_expired(500));
        assert!(!entry.is_expired(999));
        assert!(entry.is_expired(1500));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("test", Duration::from_millis(1000), 5_000);

        // Entry should be expired when current time >= expires_at
        assert!(entry.is_expired(6_000), "Entry should be expired at boundary");
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new("test", Duration::MAX, 1_700_000_000_000);
        assert_eq!(entry.expires_at, u64::MAX);
        assert!(!entry.is_expired(1_700_000_000_001));

        // Fits in u128 millis but not in u64
        let entry = CacheEntry::new("test", Duration::from_secs(u64::MAX / 10), 0);
        assert_eq!(entry.expires_at, u64::MAX);
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let entry = CacheEntry::new("test", Duration::ZERO, 42);
        assert!(entry.is_expired(42));
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = CacheEntry::new("v", Duration::from_secs(10), 1_000);

        assert_eq!(entry.ttl_remaining_ms(1_000), 10_000);
        assert_eq!(entry.ttl_remaining_ms(6_000), 5_000);
        assert_eq!(entry.ttl_remaining_ms(20_000), 0);
    }

    #[test]
    fn test_lookup_fresh() {
        let fresh = CacheEntry::new(3, Duration::from_secs(1), 0);
        assert_eq!(Lookup::Fresh(fresh).fresh(), Some(3));
        assert_eq!(Lookup::<i32>::Missing.fresh(), None);
        let stale = CacheEntry::new(1, Duration::ZERO, 0);
        assert_eq!(Lookup::Expired(stale).fresh(), None);
    }
}
