//! Coordinator events for observers.
//!
//! This module provides:
//! - [`EventEmitter`] trait the coordinator emits through
//! - [`BroadcastEventBridge`] fanning events out over a broadcast channel
//! - Event types for device lifecycle and poll cycles

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

#[cfg(test)]
pub(crate) use emitter::tests::CollectingEventEmitter;

use serde::Serialize;

/// Events delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Lifecycle changes of one tracked address.
    Device(DeviceEvent),

    /// Poll cycle summaries.
    Cycle(CycleEvent),
}

/// Lifecycle changes of one tracked address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DeviceEvent {
    /// Address added to the tracked set.
    Tracked {
        ip: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Address removed from the tracked set along with its state.
    Untracked { ip: String, timestamp: u64 },
    /// First successful poll, or recovery after a failed one.
    Available {
        ip: String,
        #[serde(rename = "zoneName")]
        zone_name: String,
        timestamp: u64,
    },
    /// A poll failed; the last good snapshot is kept.
    Unavailable {
        ip: String,
        /// Diagnostic from the failing call.
        reason: String,
        timestamp: u64,
    },
}

/// Poll cycle summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CycleEvent {
    /// Every device in the cycle has been merged.
    Completed {
        tracked: usize,
        available: usize,
        /// Addresses skipped because a poll was still in flight.
        skipped: usize,
        timestamp: u64,
    },
}
