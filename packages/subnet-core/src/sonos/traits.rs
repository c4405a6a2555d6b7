//! Trait abstractions for Sonos network operations.
//!
//! These are the only seams through which the crate touches the network.
//! Services depend on them rather than on [`SonosClientImpl`] so tests can
//! substitute scripted implementations.
//!
//! [`SonosClientImpl`]: crate::sonos::client::SonosClientImpl

use std::time::Duration;

use async_trait::async_trait;

use crate::sonos::services::SonosService;
use crate::sonos::soap::SoapResult;
use crate::sonos::types::DeviceRecord;

/// Sends one SOAP action to one speaker.
///
/// Every command and query in the crate goes through this call.
#[async_trait]
pub trait SonosControl: Send + Sync {
    /// Performs `action` on `service` at `ip` and returns the raw response body.
    ///
    /// # Arguments
    /// * `ip` - IP address of the Sonos speaker
    /// * `service` - Target service (selects URN and control path)
    /// * `action` - The SOAP action name (e.g., "GetVolume")
    /// * `arguments` - Pre-rendered, already escaped argument XML
    async fn call(
        &self,
        ip: &str,
        service: SonosService,
        action: &str,
        arguments: &str,
    ) -> SoapResult<String>;
}

/// Fetches a speaker's device description document.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    /// Returns the normalized record, or `None` when the address does not
    /// answer in time or does not identify as a Sonos device.
    async fn fetch_descriptor(&self, ip: &str, timeout: Duration) -> Option<DeviceRecord>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Combined Trait (for trait objects)
// ─────────────────────────────────────────────────────────────────────────────

/// Combined trait for everything the coordinator needs from the network.
pub trait SonosClient: SonosControl + DescriptorSource {
    /// Borrows this client as a bare [`SonosControl`] for request builders.
    fn as_control(&self) -> &dyn SonosControl;

    /// Borrows this client as a bare [`DescriptorSource`] for scans.
    fn as_descriptor_source(&self) -> &dyn DescriptorSource;
}

/// Blanket implementation for any type implementing both traits.
impl<T: SonosControl + DescriptorSource> SonosClient for T {
    fn as_control(&self) -> &dyn SonosControl {
        self
    }

    fn as_descriptor_source(&self) -> &dyn DescriptorSource {
        self
    }
}
