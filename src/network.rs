//! Network Quality Monitor
//!
//! Classifies the connection from a moving average of recent fetch latencies
//! and recommends a timeout for the next request.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::config::NetworkConfig;

// == Network Quality ==
/// Connection quality tiers, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkQuality {
    Fast,
    Normal,
    Slow,
    Poor,
}

impl fmt::Display for NetworkQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkQuality::Fast => "FAST",
            NetworkQuality::Normal => "NORMAL",
            NetworkQuality::Slow => "SLOW",
            NetworkQuality::Poor => "POOR",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Window {
    samples: VecDeque<u64>,
    quality: NetworkQuality,
}

// == Monitor ==
/// Sliding window of response times with a derived quality tier.
#[derive(Debug)]
pub struct NetworkQualityMonitor {
    config: NetworkConfig,
    window: Mutex<Window>,
}

impl Default for NetworkQualityMonitor {
    fn default() -> Self {
        Self::new(NetworkConfig::default())
    }
}

impl NetworkQualityMonitor {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            window: Mutex::new(Window {
                samples: VecDeque::with_capacity(config.sample_window),
                quality: NetworkQuality::Normal,
            }),
            config,
        }
    }

    /// Adds a latency sample and reclassifies.
    ///
    /// The oldest sample is dropped once the window is full. A zero-sized
    /// window keeps the most recent sample only.
    pub fn record_response_time(&self, ms: u64) {
        let mut window = self.window.lock();
        window.samples.push_back(ms);
        while window.samples.len() > self.config.sample_window.max(1) {
            window.samples.pop_front();
        }

        let average = mean(&window.samples);
        window.quality = average.map_or(NetworkQuality::Normal, |avg| self.classify(avg));
        debug!(
            quality = %window.quality,
            average_ms = average.unwrap_or_default() as u64,
            "network quality updated"
        );
    }

    /// Maps a mean latency onto a tier.
    pub fn classify(&self, average_ms: f64) -> NetworkQuality {
        if average_ms < self.config.fast_below_ms as f64 {
            NetworkQuality::Fast
        } else if average_ms < self.config.normal_below_ms as f64 {
            NetworkQuality::Normal
        } else if average_ms < self.config.slow_below_ms as f64 {
            NetworkQuality::Slow
        } else {
            NetworkQuality::Poor
        }
    }

    pub fn quality(&self) -> NetworkQuality {
        self.window.lock().quality
    }

    /// Recommended request timeout for the current tier.
    pub fn timeout(&self) -> Duration {
        self.timeout_for(self.quality())
    }

    pub fn timeout_for(&self, quality: NetworkQuality) -> Duration {
        match quality {
            NetworkQuality::Fast => self.config.fast_timeout,
            NetworkQuality::Normal => self.config.normal_timeout,
            NetworkQuality::Slow => self.config.slow_timeout,
            NetworkQuality::Poor => self.config.poor_timeout,
        }
    }

    /// Mean of the current window, `None` when empty.
    pub fn average_response_time(&self) -> Option<f64> {
        mean(&self.window.lock().samples)
    }

    pub fn sample_count(&self) -> usize {
        self.window.lock().samples.len()
    }

    /// Forgets all samples and returns to the neutral tier.
    pub fn reset(&self) {
        let mut window = self.window.lock();
        window.samples.clear();
        window.quality = NetworkQuality::Normal;
        debug!("network quality monitor reset");
    }
}

fn mean(samples: &VecDeque<u64>) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let total: u64 = samples.iter().sum();
    Some(total as f64 / samples.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_is_normal() {
        let monitor = NetworkQualityMonitor::default();
        assert_eq!(monitor.quality(), NetworkQuality::Normal);
        assert_eq!(monitor.timeout(), Duration::from_secs(10));
        assert_eq!(monitor.average_response_time(), None);
    }

    #[test]
    fn test_classification_thresholds() {
        let monitor = NetworkQualityMonitor::default();
        assert_eq!(monitor.classify(0.0), NetworkQuality::Fast);
        assert_eq!(monitor.classify(999.9), NetworkQuality::Fast);
        assert_eq!(monitor.classify(1000.0), NetworkQuality::Normal);
        assert_eq!(monitor.classify(2999.0), NetworkQuality::Normal);
        assert_eq!(monitor.classify(3000.0), NetworkQuality::Slow);
        assert_eq!(monitor.classify(7999.0), NetworkQuality::Slow);
        assert_eq!(monitor.classify(8000.0), NetworkQuality::Poor);
    }

    #[test]
    fn test_record_updates_quality_from_mean() {
        let monitor = NetworkQualityMonitor::default();

        monitor.record_response_time(200);
        assert_eq!(monitor.quality(), NetworkQuality::Fast);
        assert_eq!(monitor.timeout(), Duration::from_secs(5));

        // mean of 200 and 5800 = 3000
        monitor.record_response_time(5_800);
        assert_eq!(monitor.quality(), NetworkQuality::Slow);
        assert_eq!(monitor.timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_window_drops_oldest() {
        let monitor = NetworkQualityMonitor::default();

        monitor.record_response_time(100_000);
        for _ in 0..10 {
            monitor.record_response_time(100);
        }

        assert_eq!(monitor.sample_count(), 10);
        assert_eq!(monitor.average_response_time(), Some(100.0));
        assert_eq!(monitor.quality(), NetworkQuality::Fast);
    }

    #[test]
    fn test_poor_connection() {
        let monitor = NetworkQualityMonitor::default();
        monitor.record_response_time(12_000);
        assert_eq!(monitor.quality(), NetworkQuality::Poor);
        assert_eq!(monitor.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_reset() {
        let monitor = NetworkQualityMonitor::default();
        monitor.record_response_time(20_000);

        monitor.reset();

        assert_eq!(monitor.quality(), NetworkQuality::Normal);
        assert_eq!(monitor.sample_count(), 0);
    }

    #[test]
    fn test_custom_thresholds() {
        let monitor = NetworkQualityMonitor::new(NetworkConfig {
            fast_below_ms: 50,
            normal_below_ms: 100,
            slow_below_ms: 200,
            ..NetworkConfig::default()
        });
        monitor.record_response_time(150);
        assert_eq!(monitor.quality(), NetworkQuality::Slow);
    }

    #[test]
    fn test_quality_display_and_order() {
        assert_eq!(NetworkQuality::Fast.to_string(), "FAST");
        assert_eq!(NetworkQuality::Poor.to_string(), "POOR");
        assert!(NetworkQuality::Fast < NetworkQuality::Normal);
        assert!(NetworkQuality::Slow < NetworkQuality::Poor);
        assert_eq!(serde_json::to_string(&NetworkQuality::Slow).unwrap(), "\"SLOW\"");
    }
}
