//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default capacity of the in-memory tier.
pub const DEFAULT_MAX_MEMORY_ENTRIES: usize = 100;

/// Default namespace for entries written to the durable store.
pub const DEFAULT_KEY_PREFIX: &str = "api_cache_";

// == Resource Classes ==
/// Kinds of remote resources, each with its own freshness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Exercise catalogue, rarely changes
    Exercises,
    /// Generated workouts, fairly dynamic
    Workout,
    /// Search results
    Search,
    /// Image metadata
    ImageMetadata,
}

impl ResourceClass {
    /// Time-to-live for entries of this class.
    pub fn ttl(self) -> Duration {
        match self {
            ResourceClass::Exercises => Duration::from_secs(30 * 60),
            ResourceClass::Workout => Duration::from_secs(5 * 60),
            ResourceClass::Search => Duration::from_secs(10 * 60),
            ResourceClass::ImageMetadata => Duration::from_secs(60 * 60),
        }
    }
}

// == Cache Config ==
/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries the memory tier can hold
    pub max_memory_entries: usize,
    /// Prefix for keys in the durable store.
    ///
    /// Managers sharing a store need prefixes where neither is a prefix of the
    /// other, since `invalidate_all` clears by prefix match.
    pub key_prefix: String,
    /// TTL used when a caller does not pick one
    pub default_ttl: Duration,
    /// Interval of the optional background sweep; `None` disables it
    pub cleanup_interval: Option<Duration>,
    /// Network quality settings
    pub network: NetworkConfig,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_MEMORY_ENTRIES` - Memory tier capacity (default: 100)
    /// - `CACHE_KEY_PREFIX` - Durable store namespace (default: `api_cache_`)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 30 minutes)
    /// - `CACHE_CLEANUP_INTERVAL_SECS` - Sweep interval, 0 or unset disables it
    ///
    /// Network settings are read by [`NetworkConfig::from_env`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_memory_entries: env_or("CACHE_MAX_MEMORY_ENTRIES", defaults.max_memory_entries),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            default_ttl: Duration::from_millis(env_or(
                "CACHE_DEFAULT_TTL_MS",
                defaults.default_ttl.as_millis() as u64,
            )),
            cleanup_interval: Some(env_or("CACHE_CLEANUP_INTERVAL_SECS", 0u64))
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            network: NetworkConfig::from_env(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory_entries: DEFAULT_MAX_MEMORY_ENTRIES,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_ttl: ResourceClass::Exercises.ttl(),
            cleanup_interval: None,
            network: NetworkConfig::default(),
        }
    }
}

// == Network Config ==
/// Settings for the network quality monitor.
///
/// Thresholds are upper bounds on the mean latency: a mean below
/// `fast_below_ms` is fast, below `normal_below_ms` normal, below
/// `slow_below_ms` slow, anything else poor.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Number of latency samples kept in the sliding window
    pub sample_window: usize,
    pub fast_below_ms: u64,
    pub normal_below_ms: u64,
    pub slow_below_ms: u64,
    pub fast_timeout: Duration,
    pub normal_timeout: Duration,
    pub slow_timeout: Duration,
    pub poor_timeout: Duration,
}

impl NetworkConfig {
    /// Loads network settings from environment variables.
    ///
    /// # Environment Variables
    /// - `NETWORK_SAMPLE_WINDOW` (default: 10)
    /// - `NETWORK_FAST_THRESHOLD_MS` / `NETWORK_NORMAL_THRESHOLD_MS` /
    ///   `NETWORK_SLOW_THRESHOLD_MS` (defaults: 1000 / 3000 / 8000)
    /// - `NETWORK_TIMEOUT_FAST_MS` / `NETWORK_TIMEOUT_NORMAL_MS` /
    ///   `NETWORK_TIMEOUT_SLOW_MS` / `NETWORK_TIMEOUT_POOR_MS`
    ///   (defaults: 5000 / 10000 / 20000 / 30000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ms = |name: &str, fallback: Duration| {
            Duration::from_millis(env_or(name, fallback.as_millis() as u64))
        };
        Self {
            sample_window: env_or("NETWORK_SAMPLE_WINDOW", defaults.sample_window),
            fast_below_ms: env_or("NETWORK_FAST_THRESHOLD_MS", defaults.fast_below_ms),
            normal_below_ms: env_or("NETWORK_NORMAL_THRESHOLD_MS", defaults.normal_below_ms),
            slow_below_ms: env_or("NETWORK_SLOW_THRESHOLD_MS", defaults.slow_below_ms),
            fast_timeout: ms("NETWORK_TIMEOUT_FAST_MS", defaults.fast_timeout),
            normal_timeout: ms("NETWORK_TIMEOUT_NORMAL_MS", defaults.normal_timeout),
            slow_timeout: ms("NETWORK_TIMEOUT_SLOW_MS", defaults.slow_timeout),
            poor_timeout: ms("NETWORK_TIMEOUT_POOR_MS", defaults.poor_timeout),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            sample_window: 10,
            fast_below_ms: 1_000,
            normal_below_ms: 3_000,
            slow_below_ms: 8_000,
            fast_timeout: Duration::from_secs(5),
            normal_timeout: Duration::from_secs(10),
            slow_timeout: Duration::from_secs(20),
            poor_timeout: Duration::from_secs(30),
        }
    }
}

/// Reads and parses an environment variable, falling back on absence or parse failure.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.max_memory_entries, 100);
        assert_eq!(config.key_prefix, "api_cache_");
        assert_eq!(config.default_ttl, Duration::from_secs(1800));
        assert!(config.cleanup_interval.is_none());
        assert_eq!(config.network.sample_window, 10);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_MAX_MEMORY_ENTRIES");
        env::remove_var("CACHE_KEY_PREFIX");
        env::remove_var("CACHE_DEFAULT_TTL_MS");
        env::remove_var("CACHE_CLEANUP_INTERVAL_SECS");
        env::remove_var("NETWORK_SAMPLE_WINDOW");

        let config = CacheConfig::from_env();
        assert_eq!(config.max_memory_entries, 100);
        assert_eq!(config.key_prefix, "api_cache_");
        assert_eq!(config.default_ttl, Duration::from_secs(1800));
        assert!(config.cleanup_interval.is_none());
        assert_eq!(config.network.sample_window, 10);
    }

    #[test]
    fn test_network_timeouts_increase_with_severity() {
        let config = NetworkConfig::default();
        assert!(config.fast_timeout < config.normal_timeout);
        assert!(config.normal_timeout < config.slow_timeout);
        assert!(config.slow_timeout < config.poor_timeout);
    }

    #[test]
    fn test_resource_class_ttls() {
        assert_eq!(ResourceClass::Exercises.ttl(), Duration::from_secs(1800));
        assert_eq!(ResourceClass::Workout.ttl(), Duration::from_secs(300));
        assert_eq!(ResourceClass::Search.ttl(), Duration::from_secs(600));
        assert_eq!(ResourceClass::ImageMetadata.ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_env_or_ignores_garbage() {
        env::set_var("FITCACHE_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("FITCACHE_TEST_GARBAGE", 7usize), 7);
        env::remove_var("FITCACHE_TEST_GARBAGE");
    }
}
