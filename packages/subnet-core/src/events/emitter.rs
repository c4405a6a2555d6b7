//! Event emitter abstraction.
//!
//! The coordinator depends on the [`EventEmitter`] trait rather than a
//! concrete channel, so tests can count events and the binary can choose
//! how they are delivered.

use super::{CycleEvent, DeviceEvent};

/// Receives coordinator events without knowledge of transport.
pub trait EventEmitter: Send + Sync {
    /// Emits a device lifecycle event.
    fn emit_device(&self, event: DeviceEvent);

    /// Emits a poll cycle summary.
    fn emit_cycle(&self, event: CycleEvent);
}

/// Discards every event.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_device(&self, _event: DeviceEvent) {}

    fn emit_cycle(&self, _event: CycleEvent) {}
}

/// Logs every event at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_device(&self, event: DeviceEvent) {
        log::debug!("[Coordinator] device event: {:?}", event);
    }

    fn emit_cycle(&self, event: CycleEvent) {
        log::debug!("[Coordinator] cycle event: {:?}", event);
    }
}
