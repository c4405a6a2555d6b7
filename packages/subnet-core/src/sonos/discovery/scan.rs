//! Unicast subnet scanning.

use std::time::{Duration, Instant};

use futures::future::join_all;

use super::types::{ScanError, ScanResult, SubnetRange};
use crate::sonos::traits::DescriptorSource;
use crate::sonos::types::DeviceRecord;
use crate::utils::validate_speaker_ip;

/// Probes every host of `cidr` for a Sonos device description.
///
/// Hosts are probed in sequential batches of `batch_size`; probes within a
/// batch run concurrently. Unreachable and non-Sonos hosts are silently
/// skipped. Result order is unspecified.
///
/// # Errors
/// Returns [`ScanError`] for a malformed subnet or one with a prefix shorter
/// than `min_prefix`, before any probe is sent.
pub async fn scan_subnet(
    source: &dyn DescriptorSource,
    cidr: &str,
    timeout: Duration,
    batch_size: usize,
    min_prefix: u8,
) -> ScanResult<Vec<DeviceRecord>> {
    let range = SubnetRange::parse(cidr)
        .and_then(|range| range.at_most_as_wide_as(min_prefix))
        .inspect_err(|e| {
            log::error!("[Scanner] Refusing to scan {}: {}", cidr, e);
        })?;

    let batch_size = batch_size.max(1);
    let start = Instant::now();

    log::info!(
        "[Scanner] Scanning {} address(es) in {} (batch {}, timeout {:?})",
        range.host_count(),
        range,
        batch_size,
        timeout
    );

    let mut hosts = range.hosts();
    let mut found = Vec::new();
    for index in 1.. {
        let batch: Vec<String> = hosts
            .by_ref()
            .take(batch_size)
            .map(|ip| ip.to_string())
            .collect();
        if batch.is_empty() {
            break;
        }

        let probes = batch
            .iter()
            .map(|ip| source.fetch_descriptor(ip, timeout));
        let records = join_all(probes).await;

        let before = found.len();
        found.extend(records.into_iter().flatten());
        log::debug!(
            "[Scanner] Batch {} done: {} device(s) in {} address(es)",
            index,
            found.len() - before,
            batch.len()
        );
    }

    log::info!(
        "[Scanner] Found {} Sonos device(s) in {} after {}ms",
        found.len(),
        range,
        start.elapsed().as_millis()
    );

    Ok(found)
}

/// Probes a single address.
///
/// # Errors
/// Returns [`ScanError::InvalidAddress`] without touching the network when
/// `ip` is not a usable IPv4 address. A valid address that does not answer
/// yields `Ok(None)`.
pub async fn validate_address(
    source: &dyn DescriptorSource,
    ip: &str,
    timeout: Duration,
) -> ScanResult<Option<DeviceRecord>> {
    let parsed = validate_speaker_ip(ip).map_err(|e| ScanError::InvalidAddress(e.to_string()))?;
    let record = source.fetch_descriptor(&parsed.to_string(), timeout).await;

    match &record {
        Some(r) => log::info!("[Scanner] {} is {} ({})", ip, r.zone_name, r.model_name),
        None => log::info!("[Scanner] {} did not answer as a Sonos device", ip),
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::sonos::test_fixtures::{record, RecordingControl};

    /// Descriptor source that tracks peak concurrency.
    #[derive(Default)]
    struct SlowSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        probed: AtomicUsize,
    }

    #[async_trait]
    impl DescriptorSource for SlowSource {
        async fn fetch_descriptor(&self, ip: &str, _timeout: Duration) -> Option<DeviceRecord> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.probed.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ip.ends_with(".7").then(|| record(ip, "RINCON_7", "Seven"))
        }
    }

    #[tokio::test]
    async fn scan_returns_only_sonos_hosts() {
        let control = RecordingControl::default();
        control.add_device("192.168.1.2", "RINCON_B", "Bedroom");

        let found = scan_subnet(&control, "192.168.1.0/30", Duration::from_secs(1), 50, 16)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ip, "192.168.1.2");
        assert_eq!(found[0].zone_name, "Bedroom");
    }

    #[tokio::test(start_paused = true)]
    async fn scan_bounds_concurrency_to_batch_size() {
        let source = Arc::new(SlowSource::default());

        let found = scan_subnet(source.as_ref(), "10.0.0.0/27", Duration::from_secs(1), 8, 16)
            .await
            .unwrap();

        assert_eq!(source.probed.load(Ordering::SeqCst), 30);
        assert_eq!(source.peak.load(Ordering::SeqCst), 8);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ip, "10.0.0.7");
    }

    #[tokio::test]
    async fn malformed_subnet_is_rejected_before_probing() {
        let source = SlowSource::default();
        let result = scan_subnet(&source, "10.0.0.0/abc", Duration::from_secs(1), 50, 16).await;

        assert!(matches!(result, Err(ScanError::InvalidSubnet(_))));
        assert_eq!(source.probed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn subnet_wider_than_limit_is_rejected_before_probing() {
        let source = SlowSource::default();
        let result = scan_subnet(&source, "10.0.0.0/15", Duration::from_secs(1), 50, 16).await;

        assert_eq!(result, Err(ScanError::SubnetTooWide { prefix: 15, min: 16 }));
        assert_eq!(source.probed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn width_limit_follows_the_caller() {
        let source = SlowSource::default();
        let narrow = scan_subnet(&source, "10.0.0.0/22", Duration::from_secs(1), 256, 23).await;
        assert_eq!(narrow, Err(ScanError::SubnetTooWide { prefix: 22, min: 23 }));
        assert_eq!(source.probed.load(Ordering::SeqCst), 0);

        let found = scan_subnet(&source, "10.0.0.0/22", Duration::from_secs(1), 256, 22)
            .await
            .unwrap();

        assert_eq!(source.probed.load(Ordering::SeqCst), 1022);
        assert_eq!(source.peak.load(Ordering::SeqCst), 256);
        assert_eq!(found.len(), 4);
    }

    #[tokio::test]
    async fn validate_rejects_bad_address_without_network() {
        let source = SlowSource::default();
        let result = validate_address(&source, "300.1.1.1", Duration::from_secs(1)).await;

        assert!(matches!(result, Err(ScanError::InvalidAddress(_))));
        assert_eq!(source.probed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn validate_returns_record_or_none() {
        let control = RecordingControl::default();
        control.add_device("10.0.0.5", "RINCON_5", "Study");

        let hit = validate_address(&control, "10.0.0.5", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(hit.map(|r| r.uuid), Some("RINCON_5".to_string()));

        let miss = validate_address(&control, "10.0.0.6", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(miss.is_none());
    }
}
