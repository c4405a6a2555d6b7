//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by Sonos firmware and the UPnP device
//! architecture; tunable values live in [`Config`](crate::state::Config).

// ─────────────────────────────────────────────────────────────────────────────
// Device
// ─────────────────────────────────────────────────────────────────────────────

/// Port every Sonos player serves UPnP control and description on.
pub const SONOS_PORT: u16 = 1400;

/// Path of the device description document.
pub const DEVICE_DESCRIPTION_PATH: &str = "/xml/device_description.xml";

/// Lowercase marker a device description must contain to be accepted.
pub const SONOS_VENDOR_MARKER: &str = "sonos";

// ─────────────────────────────────────────────────────────────────────────────
// Scanning
// ─────────────────────────────────────────────────────────────────────────────

/// Default widest subnet the scanner accepts (a /16 is 65534 probes).
pub const DEFAULT_MIN_SCAN_PREFIX: u8 = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Control ranges
// ─────────────────────────────────────────────────────────────────────────────

/// Volume step used by volume up/down.
pub const VOLUME_STEP: u8 = 2;

/// Bass and treble accept -10..=10.
pub const EQ_MIN: i8 = -10;
pub const EQ_MAX: i8 = 10;

/// Balance accepts -100 (full left) ..= 100 (full right).
pub const BALANCE_MIN: i16 = -100;
pub const BALANCE_MAX: i16 = 100;

/// Volume assumed for balance when none has been polled yet.
pub const BALANCE_FALLBACK_VOLUME: u8 = 50;

/// Longest sleep timer the firmware accepts (2 hours).
pub const SLEEP_TIMER_MAX_SECS: u32 = 7200;

/// Fault code returned by `Stop` when the transport is already stopped.
pub const FAULT_TRANSITION_NOT_AVAILABLE: &str = "701";
