//! Sonos speaker control and discovery.
//!
//! This module provides unicast discovery and SOAP control of Sonos
//! speakers on a known subnet.
//!
//! # Module Structure
//!
//! - `types` - Domain types for device records and snapshots
//! - `services` - UPnP service definitions (URNs, paths)
//! - `traits` - Trait abstractions for testability
//! - `client` - `SonosClientImpl` concrete trait implementation
//! - `soap` - Low-level SOAP protocol implementation
//! - `tags` - Tolerant tag extraction over response bodies
//! - `descriptor` - Device description fetch and normalization
//! - `discovery` - Subnet enumeration and batched probing
//! - `zone_groups` - Zone group topology parsing
//! - `didl` - DIDL-Lite metadata parsing and formatting
//! - `queries` - Per-device poll fan-out
//! - `playback` - Transport control commands
//! - `rendering` - Volume, mute, EQ and balance commands
//! - `device_properties` - Status light and button lock commands
//! - `grouping` - Group join/leave coordination
//! - `utils` - Shared utility functions

pub mod client;
pub mod descriptor;
pub(crate) mod device_properties;
pub mod didl;
pub mod discovery;
pub(crate) mod grouping;
pub(crate) mod playback;
pub mod queries;
pub(crate) mod rendering;
pub(crate) mod retry;
pub mod services;
pub mod soap;
pub mod tags;
pub mod traits;
pub mod types;
pub mod utils;
pub mod zone_groups;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export domain types
pub use services::SonosService;
pub use types::{
    DeviceRecord, DeviceSnapshot, DeviceState, GroupMembership, PlayMode, RepeatMode, TrackInfo,
    TransportState,
};

// Re-export trait abstractions
pub use traits::{DescriptorSource, SonosClient, SonosControl};

// Re-export concrete implementation
pub use client::SonosClientImpl;

pub use grouping::JoinReport;
pub use rendering::EqSetting;
