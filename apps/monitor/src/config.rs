//! Monitor configuration.
//!
//! Loaded from YAML with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Monitor configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Speakers tracked by `watch`.
    /// Override: `SUBNET_SPEAKER_IPS` (comma separated)
    pub speaker_ips: Vec<String>,

    /// Seconds between poll cycles.
    /// Override: `SUBNET_POLL_INTERVAL`
    pub poll_interval_secs: u64,

    pub soap_timeout_secs: u64,

    pub scan_timeout_secs: u64,

    pub scan_batch_size: usize,

    /// Shortest CIDR prefix `scan` accepts.
    pub min_scan_prefix: u8,

    pub max_concurrent_requests: usize,

    /// Speaker control port.
    /// Override: `SUBNET_PORT`
    pub port: u16,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let core = subnet_core::Config::default();
        Self {
            speaker_ips: Vec::new(),
            poll_interval_secs: core.poll_interval_secs,
            soap_timeout_secs: core.soap_timeout_secs,
            scan_timeout_secs: core.scan_timeout_secs,
            scan_batch_size: core.scan_batch_size,
            min_scan_prefix: core.min_scan_prefix,
            max_concurrent_requests: core.max_concurrent_requests,
            port: core.port,
        }
    }
}

impl MonitorConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies overrides from `lookup`; unparsable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(interval) = lookup("SUBNET_POLL_INTERVAL").and_then(|v| v.parse().ok()) {
            self.poll_interval_secs = interval;
        }

        if let Some(port) = lookup("SUBNET_PORT").and_then(|v| v.parse().ok()) {
            self.port = port;
        }

        if let Some(ips) = lookup("SUBNET_SPEAKER_IPS") {
            self.speaker_ips = ips
                .split(',')
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Converts to subnet-core's Config type.
    pub fn to_core_config(&self) -> subnet_core::Config {
        subnet_core::Config {
            port: self.port,
            poll_interval_secs: self.poll_interval_secs,
            soap_timeout_secs: self.soap_timeout_secs,
            max_concurrent_requests: self.max_concurrent_requests,
            scan_timeout_secs: self.scan_timeout_secs,
            scan_batch_size: self.scan_batch_size,
            min_scan_prefix: self.min_scan_prefix,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "speaker_ips: [\"192.168.1.20\"]\npoll_interval_secs: 3").unwrap();

        let config = MonitorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.speaker_ips, vec!["192.168.1.20"]);
        assert_eq!(config.poll_interval_secs, 3);
        assert_eq!(config.port, 1400);
        assert_eq!(config.scan_batch_size, 50);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval_secs: [not, a, number]").unwrap();
        assert!(MonitorConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MonitorConfig::load(Some(&dir.path().join("absent.yaml"))).is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("SUBNET_POLL_INTERVAL", "7"),
            ("SUBNET_PORT", "not-a-port"),
            ("SUBNET_SPEAKER_IPS", "10.0.0.1, 10.0.0.2,,"),
        ]
        .into_iter()
        .collect();

        let mut config = MonitorConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.poll_interval_secs, 7);
        assert_eq!(config.port, 1400);
        assert_eq!(config.speaker_ips, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn core_config_carries_every_setting() {
        let config = MonitorConfig {
            port: 1401,
            scan_batch_size: 8,
            min_scan_prefix: 12,
            ..Default::default()
        };
        let core = config.to_core_config();
        assert_eq!(core.port, 1401);
        assert_eq!(core.scan_batch_size, 8);
        assert_eq!(core.min_scan_prefix, 12);
        assert!(core.validate().is_ok());
    }
}
