//! Runtime configuration.
//!
//! [`Config`] carries every tunable the core uses. It deserializes with
//! defaults for missing keys, so a config file only needs the values it
//! changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{DEFAULT_MIN_SCAN_PREFIX, SONOS_PORT};

/// Configuration for discovery, polling and the control client.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Control port of every speaker (1400 on real hardware).
    pub port: u16,

    // Polling
    /// Interval between scheduled poll cycles (seconds).
    pub poll_interval_secs: u64,

    /// Per-request timeout for SOAP calls (seconds).
    pub soap_timeout_secs: u64,

    /// Maximum SOAP requests in flight across all devices.
    pub max_concurrent_requests: usize,

    // Discovery
    /// Timeout for each descriptor probe (seconds).
    pub scan_timeout_secs: u64,

    /// Number of addresses probed concurrently per scan batch.
    pub scan_batch_size: usize,

    /// Shortest CIDR prefix a scan accepts; 0 allows any subnet.
    pub min_scan_prefix: u8,

    // Events
    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: SONOS_PORT,
            poll_interval_secs: 10,
            soap_timeout_secs: 10,
            max_concurrent_requests: 10,
            scan_timeout_secs: 5,
            scan_batch_size: 50,
            min_scan_prefix: DEFAULT_MIN_SCAN_PREFIX,
            event_channel_capacity: 100,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    ///
    /// # Errors
    /// Returns a description of the first value that would cause runtime
    /// issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be >= 1".to_string());
        }
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be >= 1".to_string());
        }
        if self.soap_timeout_secs == 0 {
            return Err("soap_timeout_secs must be >= 1".to_string());
        }
        if self.max_concurrent_requests == 0 {
            return Err("max_concurrent_requests must be >= 1".to_string());
        }
        if self.scan_timeout_secs == 0 {
            return Err("scan_timeout_secs must be >= 1".to_string());
        }
        if self.scan_batch_size == 0 {
            return Err("scan_batch_size must be >= 1".to_string());
        }
        if self.min_scan_prefix > 32 {
            return Err("min_scan_prefix must be <= 32".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn soap_timeout(&self) -> Duration {
        Duration::from_secs(self.soap_timeout_secs)
    }

    #[must_use]
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 1400);
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.scan_batch_size, 50);
        assert_eq!(config.min_scan_prefix, 16);
    }

    #[test]
    fn scan_prefix_limit_must_be_a_prefix_length() {
        let config = Config {
            min_scan_prefix: 33,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            min_scan_prefix: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_values_are_rejected() {
        let cases: [fn(&mut Config); 6] = [
            |c| c.poll_interval_secs = 0,
            |c| c.soap_timeout_secs = 0,
            |c| c.max_concurrent_requests = 0,
            |c| c.scan_timeout_secs = 0,
            |c| c.scan_batch_size = 0,
            |c| c.event_channel_capacity = 0,
        ];
        for mutate in cases {
            let mut config = Config::default();
            mutate(&mut config);
            assert!(config.validate().is_err(), "{config:?}");
        }
    }
}
