//! Data model shared by discovery, polling and the control surface.

use serde::Serialize;

// ─────────────────────────────────────────────────────────────────────────────
// Device identity
// ─────────────────────────────────────────────────────────────────────────────

/// Identity and static capability info for one physical Sonos unit.
///
/// Built from the device description document. Keyed by `ip` inside the
/// coordinator; `uuid` is the stable identifier topology uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Network address the record was fetched from.
    pub ip: String,
    /// Control port.
    pub port: u16,
    /// Stable identifier: UDN without `uuid:`, else serial number, else `ip`.
    pub uuid: String,
    /// Raw UDN as served, when present.
    pub udn: Option<String>,
    /// User-facing room name.
    pub zone_name: String,
    pub model_name: String,
    pub model_number: Option<String>,
    pub serial_number: Option<String>,
    pub software_version: Option<String>,
    pub hardware_version: Option<String>,
    pub mac_address: Option<String>,
    pub household_id: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// AVTransport state as reported by `GetTransportInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportState {
    Playing,
    Paused,
    #[default]
    Stopped,
    Transitioning,
    NoMediaPresent,
}

impl TransportState {
    /// Maps a UPnP `CurrentTransportState` value. Unknown values read as stopped.
    #[must_use]
    pub fn from_upnp(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "PLAYING" => Self::Playing,
            "PAUSED_PLAYBACK" | "PAUSED" => Self::Paused,
            "TRANSITIONING" => Self::Transitioning,
            "NO_MEDIA_PRESENT" => Self::NoMediaPresent,
            _ => Self::Stopped,
        }
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing | Self::Transitioning)
    }
}

/// Repeat component of the play mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Parses `off`, `all` or `one` (any case).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Some(Self::Off),
            "all" => Some(Self::All),
            "one" => Some(Self::One),
            _ => None,
        }
    }
}

/// Shuffle + repeat, the two halves of a UPnP `PlayMode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayMode {
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

impl PlayMode {
    #[must_use]
    pub fn new(shuffle: bool, repeat: RepeatMode) -> Self {
        Self { shuffle, repeat }
    }

    /// Decodes a `CurrentPlayMode` / `PlayMode` value.
    ///
    /// `SHUFFLE` on its own is the device's name for shuffle with repeat-all.
    #[must_use]
    pub fn from_upnp(value: &str) -> Self {
        let mode = value.trim().to_ascii_uppercase();
        let shuffle = mode.contains("SHUFFLE");
        let repeat = if mode == "REPEAT_ONE" || mode == "SHUFFLE_REPEAT_ONE" {
            RepeatMode::One
        } else if mode == "SHUFFLE" || (mode.contains("REPEAT") && !mode.contains("NOREPEAT")) {
            RepeatMode::All
        } else {
            RepeatMode::Off
        };
        Self { shuffle, repeat }
    }

    /// Encodes as the `NewPlayMode` value for `SetPlayMode`.
    #[must_use]
    pub fn as_upnp(&self) -> &'static str {
        match (self.shuffle, self.repeat) {
            (false, RepeatMode::Off) => "NORMAL",
            (true, RepeatMode::Off) => "SHUFFLE_NOREPEAT",
            (false, RepeatMode::All) => "REPEAT_ALL",
            (true, RepeatMode::All) => "SHUFFLE",
            (false, RepeatMode::One) => "REPEAT_ONE",
            (true, RepeatMode::One) => "SHUFFLE_REPEAT_ONE",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// What is currently loaded on the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Album art reference as served; may be relative to the device.
    pub album_art_uri: Option<String>,
    pub duration_secs: Option<u32>,
    pub position_secs: Option<u32>,
    /// 1-based queue index.
    pub number: Option<u32>,
    /// Raw content URI (`x-rincon-queue:...`, `x-sonosapi-stream:...`, ...).
    pub uri: Option<String>,
}

impl TrackInfo {
    /// Resolves the album art reference against the device it came from.
    #[must_use]
    pub fn album_art_url(&self, ip: &str, port: u16) -> Option<String> {
        let art = self.album_art_uri.as_deref()?;
        if art.starts_with("http") {
            Some(art.to_string())
        } else {
            Some(format!("http://{}:{}{}", ip, port, art))
        }
    }
}

/// Group membership of one device as seen by zone group topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembership {
    /// True when this device is the group's playback source of record.
    pub is_coordinator: bool,
    /// Addresses of every member of the group, this device included.
    pub members: Vec<String>,
}

impl Default for GroupMembership {
    /// A device absent from any topology is its own standalone group.
    fn default() -> Self {
        Self {
            is_coordinator: true,
            members: Vec::new(),
        }
    }
}

/// Aggregated per-cycle state of one device.
///
/// Fields a sub-query could not read stay `None`. Replaced wholesale on
/// every successful poll; on failure the previous value is kept with
/// `available` forced to false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub available: bool,

    pub transport_state: Option<TransportState>,
    pub transport_status: Option<String>,
    pub play_mode: Option<PlayMode>,
    pub crossfade: Option<bool>,

    pub track: TrackInfo,

    pub volume: Option<u8>,
    pub mute: Option<bool>,

    pub bass: Option<i8>,
    pub treble: Option<i8>,
    pub loudness: Option<bool>,
    /// Soundbars only; absent on devices that reject the query.
    pub night_mode: Option<bool>,
    /// Soundbars only; absent on devices that reject the query.
    pub speech_enhancement: Option<bool>,

    pub status_light: Option<bool>,
    /// True when the physical buttons are enabled (not locked).
    pub touch_controls: Option<bool>,

    pub group: GroupMembership,

    /// Unix millis of the poll that produced this snapshot.
    pub polled_at: u64,
}

impl DeviceSnapshot {
    #[must_use]
    pub fn shuffle(&self) -> Option<bool> {
        self.play_mode.map(|m| m.shuffle)
    }

    #[must_use]
    pub fn repeat(&self) -> Option<RepeatMode> {
        self.play_mode.map(|m| m.repeat)
    }
}

/// Lifecycle of a tracked address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceState {
    /// Tracked, never polled successfully.
    #[default]
    Unknown,
    Available,
    /// Last poll failed; the snapshot is the last good one.
    Unavailable,
}
