//! Application services layer.
//!
//! Orchestration on top of the protocol layer in `sonos/`.

pub mod controls;
pub mod coordinator;

pub use controls::{find_control, ControlDescriptor, ControlKind, ControlValue, CONTROLS};
pub use coordinator::{Coordinator, CycleSummary, PollOutcome};
