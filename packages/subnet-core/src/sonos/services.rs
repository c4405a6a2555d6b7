//! Sonos UPnP service definitions.
//!
//! Single source of truth for the service URNs and control paths used by
//! every SOAP command in the crate.

use serde::Serialize;

/// Sonos UPnP services reachable over SOAP.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SonosService {
    /// Audio/Video transport control (play, pause, seek, play mode, grouping).
    AVTransport,
    /// Per-speaker rendering: volume, mute, EQ.
    RenderingControl,
    /// Device-level settings such as the status LED and button lock.
    DeviceProperties,
    /// Group volume and mute control (for coordinator speakers).
    GroupRenderingControl,
    /// Media server browse interface (queue, favorites).
    ContentDirectory,
    /// Zone group topology and membership information.
    ZoneGroupTopology,
}

impl SonosService {
    /// Returns the bare service name used inside the URN.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AVTransport => "AVTransport",
            Self::RenderingControl => "RenderingControl",
            Self::DeviceProperties => "DeviceProperties",
            Self::GroupRenderingControl => "GroupRenderingControl",
            Self::ContentDirectory => "ContentDirectory",
            Self::ZoneGroupTopology => "ZoneGroupTopology",
        }
    }

    /// Returns the UPnP service URN for SOAP requests.
    #[must_use]
    pub fn urn(&self) -> &'static str {
        match self {
            Self::AVTransport => "urn:schemas-upnp-org:service:AVTransport:1",
            Self::RenderingControl => "urn:schemas-upnp-org:service:RenderingControl:1",
            Self::DeviceProperties => "urn:schemas-upnp-org:service:DeviceProperties:1",
            Self::GroupRenderingControl => "urn:schemas-upnp-org:service:GroupRenderingControl:1",
            Self::ContentDirectory => "urn:schemas-upnp-org:service:ContentDirectory:1",
            Self::ZoneGroupTopology => "urn:schemas-upnp-org:service:ZoneGroupTopology:1",
        }
    }

    /// Returns the UPnP control endpoint path for SOAP requests.
    #[must_use]
    pub fn control_path(&self) -> &'static str {
        match self {
            Self::AVTransport => "/MediaRenderer/AVTransport/Control",
            Self::RenderingControl => "/MediaRenderer/RenderingControl/Control",
            Self::DeviceProperties => "/DeviceProperties/Control",
            Self::GroupRenderingControl => "/MediaRenderer/GroupRenderingControl/Control",
            Self::ContentDirectory => "/MediaServer/ContentDirectory/Control",
            Self::ZoneGroupTopology => "/ZoneGroupTopology/Control",
        }
    }
}
