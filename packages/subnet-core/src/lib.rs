//! Subnet Core - discovery, control and monitoring of Sonos speakers on a
//! known subnet.
//!
//! # Architecture
//!
//! - [`sonos`]: Protocol layer (SOAP client, tag extraction, descriptors,
//!   subnet scanning, zone topology, commands and per-device queries)
//! - [`services`]: The polling [`Coordinator`] and the control descriptor table
//! - [`events`]: Event system for coordinator observers
//! - [`runtime`]: Task spawning abstraction
//! - [`state`]: Configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`SonosControl`] / [`DescriptorSource`]: The only network seams
//! - [`EventEmitter`](events::EventEmitter): Emitting coordinator events
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![warn(clippy::all)]

pub mod bootstrap;
pub mod error;
pub mod events;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod sonos;
pub mod state;
pub mod utils;

pub use bootstrap::{bootstrap_services, bootstrap_services_with_client, BootstrappedServices};
pub use error::{ErrorCode, ScanResult, SoapResult, SubnetError, SubnetResult};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, CycleEvent, DeviceEvent, EventEmitter,
    LoggingEventEmitter, NoopEventEmitter,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use services::{
    find_control, ControlDescriptor, ControlKind, ControlValue, Coordinator, CycleSummary,
    PollOutcome, CONTROLS,
};
pub use sonos::discovery::{scan_subnet, validate_address, ScanError, SubnetRange};
pub use sonos::{
    DescriptorSource, DeviceRecord, DeviceSnapshot, DeviceState, GroupMembership, JoinReport,
    PlayMode, RepeatMode, SonosClient, SonosClientImpl, SonosControl, SonosService, TrackInfo,
    TransportState,
};
pub use state::Config;
pub use utils::{now_millis, validate_speaker_ip, IpValidationError};
