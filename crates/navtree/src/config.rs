//! Read-side configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default debounce window before a cache entry is evicted.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Default number of envelopes the bus buffers per subscriber.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Default capacity of a background component's error channel.
pub const DEFAULT_ERROR_BUFFER: usize = 64;

/// Tunables for the event bus, Lookup and Cache.
///
/// # Example
///
/// ```rust,ignore
/// let config = NavConfig::default().with_debounce(Duration::from_millis(50));
/// let cache = Cache::new(repo, &config);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub debounce_ms: u64,
    pub bus_capacity: usize,
    pub error_buffer: usize,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            bus_capacity: DEFAULT_BUS_CAPACITY,
            error_buffer: DEFAULT_ERROR_BUFFER,
        }
    }
}

impl NavConfig {
    /// Sets the debounce window. Windows are kept in whole milliseconds;
    /// a non-zero window is rounded up, never down to zero.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms =
            u64::try_from(debounce.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX);
        self
    }

    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    pub fn with_error_buffer(mut self, capacity: usize) -> Self {
        self.error_buffer = capacity;
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: NavConfig = serde_json::from_str(r#"{"debounce_ms": 20}"#).unwrap();

        assert_eq!(config.debounce(), Duration::from_millis(20));
        assert_eq!(config.bus_capacity, DEFAULT_BUS_CAPACITY);
        assert_eq!(config.error_buffer, DEFAULT_ERROR_BUFFER);
    }

    #[test]
    fn sub_millisecond_debounce_rounds_up() {
        let config = NavConfig::default().with_debounce(Duration::from_micros(300));
        assert_eq!(config.debounce(), Duration::from_millis(1));

        let config = config.with_debounce(Duration::from_micros(2_500));
        assert_eq!(config.debounce(), Duration::from_millis(3));

        let config = config.with_debounce(Duration::ZERO);
        assert_eq!(config.debounce(), Duration::ZERO);
    }

    #[test]
    fn builders_set_fields() {
        let config = NavConfig::default()
            .with_bus_capacity(16)
            .with_error_buffer(4)
            .with_debounce(Duration::from_secs(2));

        assert_eq!(
            config,
            NavConfig {
                debounce_ms: 2_000,
                bus_capacity: 16,
                error_buffer: 4,
            }
        );
    }
}
