//! Polling coordinator for tracked speakers.
//!
//! The [`Coordinator`] owns the set of tracked addresses together with each
//! address's [`DeviceRecord`], latest [`DeviceSnapshot`] and lifecycle
//! [`DeviceState`]. A fixed-interval loop fans out one poll per address;
//! mutations go through explicit entry points and finish with a targeted
//! re-poll of the device they touched.
//!
//! # Concurrency
//!
//! - The device map sits behind a `parking_lot::RwLock` that is never held
//!   across an `.await`. Readers get clones.
//! - Every address has its own async poll lock. Scheduled polls skip an
//!   address whose lock is taken; re-polls after a mutation wait for it.
//! - Each tracking session carries a generation number, so a poll that was
//!   in flight while its address was untracked (and maybe re-tracked) is
//!   discarded instead of merged.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::{SubnetError, SubnetResult};
use crate::events::{CycleEvent, DeviceEvent, EventEmitter};
use crate::protocol_constants::{BALANCE_FALLBACK_VOLUME, BALANCE_MAX, BALANCE_MIN, VOLUME_STEP};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::sonos::discovery::{scan_subnet, validate_address};
use crate::sonos::queries::poll_device;
use crate::sonos::soap::SoapResult;
use crate::sonos::{
    device_properties, grouping, playback, rendering, DeviceRecord, DeviceSnapshot, DeviceState,
    EqSetting, JoinReport, PlayMode, RepeatMode, SonosClient, SonosControl,
};
use crate::state::Config;
use crate::utils::{now_millis, validate_speaker_ip};

/// Everything the coordinator knows about one tracked address.
#[derive(Debug, Clone)]
struct TrackedDevice {
    record: Option<DeviceRecord>,
    snapshot: Option<DeviceSnapshot>,
    state: DeviceState,
    generation: u64,
}

/// Result of polling one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Available,
    Unavailable,
    /// Another poll of the address was in flight.
    Skipped,
    /// The address is not (or no longer) tracked.
    NotTracked,
}

/// Counts for one completed poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub tracked: usize,
    pub available: usize,
    pub unavailable: usize,
    pub skipped: usize,
}

/// Owns tracked speakers and keeps their snapshots current.
pub struct Coordinator {
    client: Arc<dyn SonosClient>,
    config: Config,
    devices: RwLock<HashMap<String, TrackedDevice>>,
    /// One entry per tracked address, added and removed with `devices`.
    poll_locks: DashMap<String, Arc<Mutex<()>>>,
    wake: Notify,
    emitter: Arc<dyn EventEmitter>,
    spawner: TokioSpawner,
    next_generation: AtomicU64,
}

impl Coordinator {
    /// Creates a coordinator with nothing tracked.
    ///
    /// # Arguments
    /// * `client` - Network client for SOAP calls and descriptor fetches
    /// * `config` - Timeouts, poll interval and scan batch size
    /// * `emitter` - Receives device lifecycle and cycle events
    /// * `spawner` - Runs the poll loop and the per-cycle poll tasks
    pub fn new(
        client: Arc<dyn SonosClient>,
        config: Config,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            client,
            config,
            devices: RwLock::new(HashMap::new()),
            poll_locks: DashMap::new(),
            wake: Notify::new(),
            emitter,
            spawner,
            next_generation: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn control(&self) -> &dyn SonosControl {
        self.client.as_control()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tracking
    // ─────────────────────────────────────────────────────────────────────

    /// Starts tracking `ip` in state [`DeviceState::Unknown`].
    ///
    /// Returns `Ok(false)` if the address was already tracked.
    ///
    /// # Errors
    /// Returns [`SubnetError::InvalidIp`] for an unusable address.
    pub fn track(&self, ip: &str) -> SubnetResult<bool> {
        let ip = validate_speaker_ip(ip)?.to_string();

        {
            let mut devices = self.devices.write();
            if devices.contains_key(&ip) {
                return Ok(false);
            }
            devices.insert(
                ip.clone(),
                TrackedDevice {
                    record: None,
                    snapshot: None,
                    state: DeviceState::Unknown,
                    generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
                },
            );
            self.poll_locks.insert(ip.clone(), Arc::default());
        }

        log::info!("[Coordinator] Tracking {}", ip);
        self.emitter.emit_device(DeviceEvent::Tracked {
            ip,
            timestamp: now_millis(),
        });
        Ok(true)
    }

    /// Stops tracking `ip` and drops its record and snapshot.
    ///
    /// Returns false if the address was not tracked.
    pub fn untrack(&self, ip: &str) -> bool {
        {
            let mut devices = self.devices.write();
            if devices.remove(ip).is_none() {
                return false;
            }
            self.poll_locks.remove(ip);
        }

        log::info!("[Coordinator] Untracked {}", ip);
        self.emitter.emit_device(DeviceEvent::Untracked {
            ip: ip.to_string(),
            timestamp: now_millis(),
        });
        true
    }

    /// Tracked addresses, sorted.
    #[must_use]
    pub fn tracked(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.devices.read().keys().cloned().collect();
        addresses.sort();
        addresses
    }

    #[must_use]
    pub fn is_tracked(&self, ip: &str) -> bool {
        self.devices.read().contains_key(ip)
    }

    fn ensure_tracked(&self, ip: &str) -> SubnetResult<()> {
        if self.is_tracked(ip) {
            Ok(())
        } else {
            Err(SubnetError::DeviceNotFound(ip.to_string()))
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Latest snapshot of `ip`, if it has ever been polled successfully.
    #[must_use]
    pub fn snapshot(&self, ip: &str) -> Option<DeviceSnapshot> {
        self.devices.read().get(ip).and_then(|d| d.snapshot.clone())
    }

    /// Every snapshot, keyed by address. Devices never polled successfully
    /// are absent.
    #[must_use]
    pub fn all_snapshots(&self) -> HashMap<String, DeviceSnapshot> {
        self.devices
            .read()
            .iter()
            .filter_map(|(ip, d)| d.snapshot.clone().map(|s| (ip.clone(), s)))
            .collect()
    }

    #[must_use]
    pub fn state(&self, ip: &str) -> Option<DeviceState> {
        self.devices.read().get(ip).map(|d| d.state)
    }

    #[must_use]
    pub fn record(&self, ip: &str) -> Option<DeviceRecord> {
        self.devices.read().get(ip).and_then(|d| d.record.clone())
    }

    fn current<T>(&self, ip: &str, read: impl FnOnce(&DeviceSnapshot) -> Option<T>) -> Option<T> {
        self.devices
            .read()
            .get(ip)
            .and_then(|d| d.snapshot.as_ref())
            .and_then(read)
    }

    /// Members of `ip`'s group that are tracked and identified, with their
    /// records. Untracked members are omitted.
    #[must_use]
    pub fn group_of(&self, ip: &str) -> Vec<(String, DeviceRecord)> {
        let devices = self.devices.read();
        let Some(members) = devices
            .get(ip)
            .and_then(|d| d.snapshot.as_ref())
            .map(|s| s.group.members.clone())
        else {
            return Vec::new();
        };

        members
            .into_iter()
            .filter_map(|member| {
                let record = devices.get(&member)?.record.clone()?;
                Some((member, record))
            })
            .collect()
    }

    /// Address of the coordinator of `ip`'s group, among tracked members.
    #[must_use]
    pub fn coordinator_of(&self, ip: &str) -> Option<String> {
        let devices = self.devices.read();
        let group = &devices.get(ip)?.snapshot.as_ref()?.group;

        if group.members.is_empty() {
            return group.is_coordinator.then(|| ip.to_string());
        }

        group
            .members
            .iter()
            .find(|member| {
                devices
                    .get(member.as_str())
                    .and_then(|d| d.snapshot.as_ref())
                    .is_some_and(|s| s.group.is_coordinator)
            })
            .cloned()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Discovery
    // ─────────────────────────────────────────────────────────────────────

    /// Scans `cidr` with the configured timeout, batch size and width limit.
    ///
    /// # Errors
    /// Returns [`SubnetError::Scan`] for a malformed or oversized subnet.
    pub async fn scan(&self, cidr: &str) -> SubnetResult<Vec<DeviceRecord>> {
        Ok(scan_subnet(
            self.client.as_descriptor_source(),
            cidr,
            self.config.scan_timeout(),
            self.config.scan_batch_size,
            self.config.min_scan_prefix,
        )
        .await?)
    }

    /// Probes one address with the configured timeout.
    ///
    /// # Errors
    /// Returns [`SubnetError::Scan`] for an invalid address.
    pub async fn probe(&self, ip: &str) -> SubnetResult<Option<DeviceRecord>> {
        Ok(validate_address(
            self.client.as_descriptor_source(),
            ip,
            self.config.scan_timeout(),
        )
        .await?)
    }

    /// Re-fetches the device description of a tracked address.
    ///
    /// Only the display name of an existing record changes.
    ///
    /// # Errors
    /// [`SubnetError::DeviceNotFound`] if untracked,
    /// [`SubnetError::Unreachable`] if the descriptor cannot be fetched.
    pub async fn refresh_record(&self, ip: &str) -> SubnetResult<DeviceRecord> {
        self.ensure_tracked(ip)?;

        let fetched = self
            .client
            .fetch_descriptor(ip, self.config.scan_timeout())
            .await
            .ok_or_else(|| SubnetError::Unreachable(ip.to_string()))?;

        let mut devices = self.devices.write();
        let device = devices
            .get_mut(ip)
            .ok_or_else(|| SubnetError::DeviceNotFound(ip.to_string()))?;
        Ok(store_record(ip, device, fetched))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Polling
    // ─────────────────────────────────────────────────────────────────────

    /// Poll lock of a tracked address. Entries live exactly as long as the
    /// address is tracked.
    fn poll_lock(&self, ip: &str) -> Option<Arc<Mutex<()>>> {
        self.poll_locks.get(ip).map(|lock| Arc::clone(lock.value()))
    }

    /// Asks the poll loop to run a cycle now.
    pub fn request_immediate_poll(&self) {
        self.wake.notify_one();
    }

    /// Runs one cycle over every tracked address and resolves once all of
    /// them are merged. Addresses with a poll already in flight are skipped.
    pub async fn poll_once(&self) -> CycleSummary {
        let addresses = self.tracked();

        let polls = addresses.iter().map(|ip| async move {
            let Some(lock) = self.poll_lock(ip) else {
                return PollOutcome::NotTracked;
            };
            let Ok(_guard) = lock.try_lock() else {
                log::debug!("[Coordinator] Poll of {} still in flight, skipping", ip);
                return PollOutcome::Skipped;
            };
            self.poll_address(ip).await
        });
        let outcomes = join_all(polls).await;

        let mut summary = CycleSummary {
            tracked: addresses.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                PollOutcome::Available => summary.available += 1,
                PollOutcome::Unavailable => summary.unavailable += 1,
                PollOutcome::Skipped => summary.skipped += 1,
                PollOutcome::NotTracked => {}
            }
        }

        log::debug!(
            "[Coordinator] Cycle complete: {}/{} available, {} skipped",
            summary.available,
            summary.tracked,
            summary.skipped
        );
        self.emitter.emit_cycle(CycleEvent::Completed {
            tracked: summary.tracked,
            available: summary.available,
            skipped: summary.skipped,
            timestamp: now_millis(),
        });
        summary
    }

    /// Polls `ip` now, waiting for any in-flight poll of it to finish first.
    pub async fn repoll(&self, ip: &str) -> PollOutcome {
        let Some(lock) = self.poll_lock(ip) else {
            return PollOutcome::NotTracked;
        };
        let _guard = lock.lock().await;
        self.poll_address(ip).await
    }

    /// Polls one address and merges the result. Callers hold its poll lock.
    async fn poll_address(&self, ip: &str) -> PollOutcome {
        let Some((record, state, generation)) = self
            .devices
            .read()
            .get(ip)
            .map(|d| (d.record.clone(), d.state, d.generation))
        else {
            return PollOutcome::NotTracked;
        };

        // Identify new devices, and refresh the name of recovering ones.
        let fetched = if record.is_none() || state == DeviceState::Unavailable {
            match self
                .client
                .fetch_descriptor(ip, self.config.scan_timeout())
                .await
            {
                Some(fetched) => Some(fetched),
                None => {
                    return self.mark_unavailable(
                        ip,
                        generation,
                        "device description unavailable".to_string(),
                    )
                }
            }
        } else {
            None
        };

        let uuid = fetched
            .as_ref()
            .or(record.as_ref())
            .map(|r| r.uuid.clone())
            .unwrap_or_default();

        match poll_device(self.control(), ip, &uuid).await {
            Ok(snapshot) => self.mark_available(ip, generation, fetched, snapshot),
            Err(e) => self.mark_unavailable(ip, generation, e.to_string()),
        }
    }

    fn mark_available(
        &self,
        ip: &str,
        generation: u64,
        fetched: Option<DeviceRecord>,
        snapshot: DeviceSnapshot,
    ) -> PollOutcome {
        let event = {
            let mut devices = self.devices.write();
            let Some(device) = devices.get_mut(ip).filter(|d| d.generation == generation) else {
                log::debug!("[Coordinator] Discarding poll of {}: no longer tracked", ip);
                return PollOutcome::NotTracked;
            };

            if let Some(fetched) = fetched {
                store_record(ip, device, fetched);
            }
            device.snapshot = Some(snapshot);

            let previous = std::mem::replace(&mut device.state, DeviceState::Available);
            (previous != DeviceState::Available).then(|| DeviceEvent::Available {
                ip: ip.to_string(),
                zone_name: device
                    .record
                    .as_ref()
                    .map(|r| r.zone_name.clone())
                    .unwrap_or_default(),
                timestamp: now_millis(),
            })
        };

        if let Some(event) = event {
            log::info!("[Coordinator] {} is available", ip);
            self.emitter.emit_device(event);
        }
        PollOutcome::Available
    }

    fn mark_unavailable(&self, ip: &str, generation: u64, reason: String) -> PollOutcome {
        let changed = {
            let mut devices = self.devices.write();
            let Some(device) = devices.get_mut(ip).filter(|d| d.generation == generation) else {
                return PollOutcome::NotTracked;
            };

            if let Some(snapshot) = device.snapshot.as_mut() {
                snapshot.available = false;
            }
            std::mem::replace(&mut device.state, DeviceState::Unavailable)
                != DeviceState::Unavailable
        };

        if changed {
            log::warn!("[Coordinator] {} is unavailable: {}", ip, reason);
            self.emitter.emit_device(DeviceEvent::Unavailable {
                ip: ip.to_string(),
                reason,
                timestamp: now_millis(),
            });
        } else {
            log::debug!("[Coordinator] {} still unavailable: {}", ip, reason);
        }
        PollOutcome::Unavailable
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Runs the poll loop until `token` is cancelled.
    ///
    /// Each tick spawns a cycle without waiting for the previous one.
    /// [`request_immediate_poll`](Self::request_immediate_poll) triggers an
    /// extra cycle and pushes the next scheduled tick back a full interval.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "[Coordinator] Polling every {:?}",
            self.config.poll_interval()
        );

        loop {
            let is_manual_refresh = tokio::select! {
                _ = token.cancelled() => {
                    log::info!("[Coordinator] Shutting down poll loop");
                    break;
                }
                _ = interval.tick() => false,
                _ = self.wake.notified() => {
                    log::debug!("[Coordinator] Immediate poll requested");
                    true
                }
            };

            if is_manual_refresh {
                interval.reset();
            }

            let this = Arc::clone(&self);
            self.spawner.spawn(async move {
                this.poll_once().await;
            });
        }
    }

    /// Spawns [`run`](Self::run) on the coordinator's spawner.
    pub fn spawn(self: &Arc<Self>, token: CancellationToken) {
        let this = Arc::clone(self);
        self.spawner.spawn(this.run(token));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Converts a command result and re-polls `ip` on success.
    async fn finish(&self, ip: &str, result: SoapResult<()>) -> SubnetResult<()> {
        result?;
        if self.repoll(ip).await == PollOutcome::Unavailable {
            log::warn!("[Coordinator] Re-poll of {} failed after a command", ip);
        }
        Ok(())
    }

    pub async fn play(&self, ip: &str) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, playback::play(self.control(), ip).await)
            .await
    }

    pub async fn pause(&self, ip: &str) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, playback::pause(self.control(), ip).await)
            .await
    }

    pub async fn stop(&self, ip: &str) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, playback::stop(self.control(), ip).await)
            .await
    }

    pub async fn next(&self, ip: &str) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, playback::next(self.control(), ip).await)
            .await
    }

    pub async fn previous(&self, ip: &str) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, playback::previous(self.control(), ip).await)
            .await
    }

    pub async fn seek(&self, ip: &str, seconds: u32) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, playback::seek(self.control(), ip, seconds).await)
            .await
    }

    pub async fn clear_queue(&self, ip: &str) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, playback::clear_queue(self.control(), ip).await)
            .await
    }

    /// Loads `uri` and starts playback.
    pub async fn play_uri(&self, ip: &str, uri: &str, title: Option<&str>) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        if uri.trim().is_empty() {
            return Err(SubnetError::InvalidRequest("empty URI".to_string()));
        }
        self.finish(
            ip,
            playback::play_uri(self.control(), ip, uri, title).await,
        )
        .await
    }

    pub async fn set_volume(&self, ip: &str, volume: u8) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, rendering::set_volume(self.control(), ip, volume).await)
            .await
    }

    /// Raises the volume by one step from the last polled value.
    ///
    /// # Errors
    /// [`SubnetError::InvalidRequest`] if no volume has been polled yet.
    pub async fn volume_up(&self, ip: &str) -> SubnetResult<u8> {
        self.step_volume(ip, i16::from(VOLUME_STEP)).await
    }

    /// Lowers the volume by one step from the last polled value.
    pub async fn volume_down(&self, ip: &str) -> SubnetResult<u8> {
        self.step_volume(ip, -i16::from(VOLUME_STEP)).await
    }

    async fn step_volume(&self, ip: &str, delta: i16) -> SubnetResult<u8> {
        self.ensure_tracked(ip)?;
        let current = self.current(ip, |s| s.volume).ok_or_else(|| {
            SubnetError::InvalidRequest(format!("volume of {ip} has not been polled yet"))
        })?;

        let target = u8::try_from((i16::from(current) + delta).clamp(0, 100)).unwrap_or(0);
        self.finish(ip, rendering::set_volume(self.control(), ip, target).await)
            .await?;
        Ok(target)
    }

    pub async fn set_mute(&self, ip: &str, mute: bool) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, rendering::set_mute(self.control(), ip, mute).await)
            .await
    }

    /// Sets shuffle, keeping the last polled repeat mode.
    pub async fn set_shuffle(&self, ip: &str, shuffle: bool) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        let repeat = self.current(ip, |s| s.repeat()).unwrap_or(RepeatMode::Off);
        self.finish(
            ip,
            playback::set_play_mode(self.control(), ip, PlayMode::new(shuffle, repeat)).await,
        )
        .await
    }

    /// Sets repeat, keeping the last polled shuffle flag.
    pub async fn set_repeat(&self, ip: &str, repeat: RepeatMode) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        let shuffle = self.current(ip, |s| s.shuffle()).unwrap_or(false);
        self.finish(
            ip,
            playback::set_play_mode(self.control(), ip, PlayMode::new(shuffle, repeat)).await,
        )
        .await
    }

    pub async fn set_crossfade(&self, ip: &str, enabled: bool) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, playback::set_crossfade(self.control(), ip, enabled).await)
            .await
    }

    pub async fn set_bass(&self, ip: &str, level: i8) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, rendering::set_bass(self.control(), ip, level).await)
            .await
    }

    pub async fn set_treble(&self, ip: &str, level: i8) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, rendering::set_treble(self.control(), ip, level).await)
            .await
    }

    pub async fn set_loudness(&self, ip: &str, enabled: bool) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, rendering::set_loudness(self.control(), ip, enabled).await)
            .await
    }

    pub async fn set_night_mode(&self, ip: &str, enabled: bool) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(
            ip,
            rendering::set_eq(self.control(), ip, EqSetting::NightMode, enabled).await,
        )
        .await
    }

    pub async fn set_speech_enhancement(&self, ip: &str, enabled: bool) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(
            ip,
            rendering::set_eq(self.control(), ip, EqSetting::DialogLevel, enabled).await,
        )
        .await
    }

    /// Pushes an approximate left/right balance around the polled volume.
    ///
    /// # Errors
    /// [`SubnetError::InvalidRequest`] outside -100..=100.
    pub async fn set_balance(&self, ip: &str, balance: i16) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        if !(BALANCE_MIN..=BALANCE_MAX).contains(&balance) {
            return Err(SubnetError::InvalidRequest(format!(
                "balance {balance} outside {BALANCE_MIN}..={BALANCE_MAX}"
            )));
        }
        let base = self
            .current(ip, |s| s.volume)
            .unwrap_or(BALANCE_FALLBACK_VOLUME);
        self.finish(
            ip,
            rendering::set_balance(self.control(), ip, base, balance).await,
        )
        .await
    }

    pub async fn set_status_light(&self, ip: &str, on: bool) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(
            ip,
            device_properties::set_status_light(self.control(), ip, on).await,
        )
        .await
    }

    pub async fn set_touch_controls(&self, ip: &str, enabled: bool) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(
            ip,
            device_properties::set_touch_controls(self.control(), ip, enabled).await,
        )
        .await
    }

    /// Arms the sleep timer.
    ///
    /// # Errors
    /// [`SubnetError::InvalidRequest`] outside 1..=7200 seconds.
    pub async fn set_sleep_timer(&self, ip: &str, seconds: u32) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        if !playback::is_valid_sleep_duration(seconds) {
            return Err(SubnetError::InvalidRequest(format!(
                "sleep timer of {seconds}s is out of range"
            )));
        }
        self.finish(
            ip,
            playback::set_sleep_timer(self.control(), ip, seconds).await,
        )
        .await
    }

    pub async fn clear_sleep_timer(&self, ip: &str) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, playback::clear_sleep_timer(self.control(), ip).await)
            .await
    }

    /// Joins `ip` to the group coordinated by the device with `coordinator_uuid`.
    pub async fn join(&self, ip: &str, coordinator_uuid: &str) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(
            ip,
            grouping::join(self.control(), ip, coordinator_uuid).await,
        )
        .await
    }

    /// Joins every member to the group of the tracked `coordinator_ip`.
    ///
    /// Best effort: failed and untracked members are logged and reported,
    /// and the remaining members still join.
    ///
    /// # Errors
    /// [`SubnetError::DeviceNotFound`] when the coordinator is untracked or
    /// not yet identified.
    pub async fn join_group(
        &self,
        members: &[String],
        coordinator_ip: &str,
    ) -> SubnetResult<JoinReport> {
        let coordinator_uuid = self
            .record(coordinator_ip)
            .map(|r| r.uuid)
            .ok_or_else(|| SubnetError::DeviceNotFound(coordinator_ip.to_string()))?;

        let (tracked, untracked): (Vec<String>, Vec<String>) = members
            .iter()
            .filter(|m| m.as_str() != coordinator_ip)
            .cloned()
            .partition(|m| self.is_tracked(m));

        let mut report =
            grouping::join_all_members(self.control(), &tracked, &coordinator_uuid).await;
        for ip in untracked {
            log::warn!("[Coordinator] Cannot join {}: not tracked", ip);
            report.failures.push((ip.clone(), format!("Device not found: {ip}")));
        }

        let affected = report
            .joined
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(coordinator_ip));
        join_all(affected.map(|ip| self.repoll(ip))).await;

        Ok(report)
    }

    /// Makes `ip` leave its group.
    pub async fn unjoin(&self, ip: &str) -> SubnetResult<()> {
        self.ensure_tracked(ip)?;
        self.finish(ip, grouping::unjoin(self.control(), ip).await)
            .await
    }
}

/// Stores a freshly fetched record. An existing record only takes the new
/// display name.
fn store_record(ip: &str, device: &mut TrackedDevice, fetched: DeviceRecord) -> DeviceRecord {
    let record = device.record.get_or_insert_with(|| fetched.clone());
    if record.zone_name != fetched.zone_name {
        log::info!(
            "[Coordinator] {} renamed: {} -> {}",
            ip,
            record.zone_name,
            fetched.zone_name
        );
        record.zone_name = fetched.zone_name;
    }
    record.clone()
}
