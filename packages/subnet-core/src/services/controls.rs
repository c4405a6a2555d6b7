//! Data-driven control descriptors.
//!
//! Presentation layers bind on/off switches and sliders to [`CONTROLS`]
//! instead of hard-coding one widget per setting. Each entry says how to
//! read its value from a [`DeviceSnapshot`] and which coordinator mutation
//! writes it; [`Coordinator::apply_control`] does the dispatch.

use serde::Serialize;

use crate::error::{SubnetError, SubnetResult};
use crate::sonos::tags::parse_bool;
use crate::sonos::DeviceSnapshot;

use super::coordinator::Coordinator;

/// Shape of a control's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlKind {
    Toggle,
    Ranged { min: i32, max: i32, step: i32 },
}

/// A control's current or requested value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ControlValue {
    Toggle(bool),
    Level(i32),
}

impl ControlValue {
    /// Parses command-line text for a control of `kind`.
    ///
    /// # Errors
    /// [`SubnetError::InvalidRequest`] when the text does not fit the kind.
    pub fn parse(kind: ControlKind, text: &str) -> SubnetResult<Self> {
        let text = text.trim();
        match kind {
            ControlKind::Toggle => {
                let lower = text.to_ascii_lowercase();
                match lower.as_str() {
                    "0" | "false" | "off" | "no" => Ok(Self::Toggle(false)),
                    _ if parse_bool(&lower) => Ok(Self::Toggle(true)),
                    _ => Err(SubnetError::InvalidRequest(format!(
                        "expected on/off, got {text:?}"
                    ))),
                }
            }
            ControlKind::Ranged { .. } => text.parse().map(Self::Level).map_err(|_| {
                SubnetError::InvalidRequest(format!("expected a number, got {text:?}"))
            }),
        }
    }
}

/// Which coordinator mutation writes a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTarget {
    Crossfade,
    Loudness,
    StatusLight,
    TouchControls,
    NightMode,
    SpeechEnhancement,
    Shuffle,
    Mute,
    Bass,
    Treble,
    Balance,
    Volume,
}

/// One entry of the control table.
#[derive(Debug, Clone, Copy)]
pub struct ControlDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub kind: ControlKind,
    pub read: fn(&DeviceSnapshot) -> Option<ControlValue>,
    pub target: ControlTarget,
    /// The device has no native setting; the value is derived.
    pub approximate: bool,
}

impl ControlDescriptor {
    /// Current value from `snapshot`, absent when the device did not report it.
    #[must_use]
    pub fn value(&self, snapshot: &DeviceSnapshot) -> Option<ControlValue> {
        (self.read)(snapshot)
    }

    /// Checks `value` against the control's kind and range.
    ///
    /// # Errors
    /// [`SubnetError::InvalidRequest`] on a kind mismatch or out-of-range level.
    pub fn check(&self, value: ControlValue) -> SubnetResult<()> {
        match (self.kind, value) {
            (ControlKind::Toggle, ControlValue::Toggle(_)) => Ok(()),
            (ControlKind::Ranged { min, max, .. }, ControlValue::Level(level)) => {
                if (min..=max).contains(&level) {
                    Ok(())
                } else {
                    Err(SubnetError::InvalidRequest(format!(
                        "{} must be within {min}..={max}, got {level}",
                        self.key
                    )))
                }
            }
            (kind, value) => Err(SubnetError::InvalidRequest(format!(
                "{} expects {kind:?}, got {value:?}",
                self.key
            ))),
        }
    }
}

const TOGGLE: ControlKind = ControlKind::Toggle;
const EQ_RANGE: ControlKind = ControlKind::Ranged {
    min: -10,
    max: 10,
    step: 1,
};

fn toggle(value: Option<bool>) -> Option<ControlValue> {
    value.map(ControlValue::Toggle)
}

fn level(value: Option<impl Into<i32>>) -> Option<ControlValue> {
    value.map(|v| ControlValue::Level(v.into()))
}

fn read_crossfade(s: &DeviceSnapshot) -> Option<ControlValue> {
    toggle(s.crossfade)
}

fn read_loudness(s: &DeviceSnapshot) -> Option<ControlValue> {
    toggle(s.loudness)
}

fn read_status_light(s: &DeviceSnapshot) -> Option<ControlValue> {
    toggle(s.status_light)
}

fn read_touch_controls(s: &DeviceSnapshot) -> Option<ControlValue> {
    toggle(s.touch_controls)
}

fn read_night_mode(s: &DeviceSnapshot) -> Option<ControlValue> {
    toggle(s.night_mode)
}

fn read_speech_enhancement(s: &DeviceSnapshot) -> Option<ControlValue> {
    toggle(s.speech_enhancement)
}

fn read_shuffle(s: &DeviceSnapshot) -> Option<ControlValue> {
    toggle(s.shuffle())
}

fn read_mute(s: &DeviceSnapshot) -> Option<ControlValue> {
    toggle(s.mute)
}

fn read_bass(s: &DeviceSnapshot) -> Option<ControlValue> {
    level(s.bass)
}

fn read_treble(s: &DeviceSnapshot) -> Option<ControlValue> {
    level(s.treble)
}

// Balance is write-only on the device.
fn read_balance(_: &DeviceSnapshot) -> Option<ControlValue> {
    Some(ControlValue::Level(0))
}

fn read_volume(s: &DeviceSnapshot) -> Option<ControlValue> {
    level(s.volume)
}

/// Every control a presentation layer can bind.
pub static CONTROLS: &[ControlDescriptor] = &[
    ControlDescriptor {
        key: "crossfade",
        name: "Crossfade",
        kind: TOGGLE,
        read: read_crossfade,
        target: ControlTarget::Crossfade,
        approximate: false,
    },
    ControlDescriptor {
        key: "loudness",
        name: "Loudness",
        kind: TOGGLE,
        read: read_loudness,
        target: ControlTarget::Loudness,
        approximate: false,
    },
    ControlDescriptor {
        key: "status_light",
        name: "Status Light",
        kind: TOGGLE,
        read: read_status_light,
        target: ControlTarget::StatusLight,
        approximate: false,
    },
    ControlDescriptor {
        key: "touch_controls",
        name: "Touch Controls",
        kind: TOGGLE,
        read: read_touch_controls,
        target: ControlTarget::TouchControls,
        approximate: false,
    },
    ControlDescriptor {
        key: "night_mode",
        name: "Night Sound",
        kind: TOGGLE,
        read: read_night_mode,
        target: ControlTarget::NightMode,
        approximate: false,
    },
    ControlDescriptor {
        key: "speech_enhancement",
        name: "Speech Enhancement",
        kind: TOGGLE,
        read: read_speech_enhancement,
        target: ControlTarget::SpeechEnhancement,
        approximate: false,
    },
    ControlDescriptor {
        key: "shuffle",
        name: "Shuffle",
        kind: TOGGLE,
        read: read_shuffle,
        target: ControlTarget::Shuffle,
        approximate: false,
    },
    ControlDescriptor {
        key: "mute",
        name: "Mute",
        kind: TOGGLE,
        read: read_mute,
        target: ControlTarget::Mute,
        approximate: false,
    },
    ControlDescriptor {
        key: "bass",
        name: "Bass",
        kind: EQ_RANGE,
        read: read_bass,
        target: ControlTarget::Bass,
        approximate: false,
    },
    ControlDescriptor {
        key: "treble",
        name: "Treble",
        kind: EQ_RANGE,
        read: read_treble,
        target: ControlTarget::Treble,
        approximate: false,
    },
    ControlDescriptor {
        key: "balance",
        name: "Balance",
        kind: ControlKind::Ranged {
            min: -100,
            max: 100,
            step: 1,
        },
        read: read_balance,
        target: ControlTarget::Balance,
        approximate: true,
    },
    ControlDescriptor {
        key: "volume",
        name: "Volume",
        kind: ControlKind::Ranged {
            min: 0,
            max: 100,
            step: 1,
        },
        read: read_volume,
        target: ControlTarget::Volume,
        approximate: false,
    },
];

/// Looks up a control by key.
#[must_use]
pub fn find_control(key: &str) -> Option<&'static ControlDescriptor> {
    CONTROLS.iter().find(|c| c.key == key)
}

fn narrow<T: TryFrom<i32>>(key: &str, level: i32) -> SubnetResult<T> {
    T::try_from(level)
        .map_err(|_| SubnetError::InvalidRequest(format!("{key} value {level} out of range")))
}

impl Coordinator {
    /// Applies `value` to the control `key` on `ip`.
    ///
    /// # Errors
    /// [`SubnetError::InvalidRequest`] for an unknown key or an invalid value,
    /// otherwise whatever the underlying mutation returns.
    pub async fn apply_control(&self, ip: &str, key: &str, value: ControlValue) -> SubnetResult<()> {
        let control = find_control(key)
            .ok_or_else(|| SubnetError::InvalidRequest(format!("unknown control: {key}")))?;
        control.check(value)?;

        match (control.target, value) {
            (ControlTarget::Crossfade, ControlValue::Toggle(on)) => self.set_crossfade(ip, on).await,
            (ControlTarget::Loudness, ControlValue::Toggle(on)) => self.set_loudness(ip, on).await,
            (ControlTarget::StatusLight, ControlValue::Toggle(on)) => {
                self.set_status_light(ip, on).await
            }
            (ControlTarget::TouchControls, ControlValue::Toggle(on)) => {
                self.set_touch_controls(ip, on).await
            }
            (ControlTarget::NightMode, ControlValue::Toggle(on)) => {
                self.set_night_mode(ip, on).await
            }
            (ControlTarget::SpeechEnhancement, ControlValue::Toggle(on)) => {
                self.set_speech_enhancement(ip, on).await
            }
            (ControlTarget::Shuffle, ControlValue::Toggle(on)) => self.set_shuffle(ip, on).await,
            (ControlTarget::Mute, ControlValue::Toggle(on)) => self.set_mute(ip, on).await,
            (ControlTarget::Bass, ControlValue::Level(v)) => {
                self.set_bass(ip, narrow(key, v)?).await
            }
            (ControlTarget::Treble, ControlValue::Level(v)) => {
                self.set_treble(ip, narrow(key, v)?).await
            }
            (ControlTarget::Balance, ControlValue::Level(v)) => {
                self.set_balance(ip, narrow(key, v)?).await
            }
            (ControlTarget::Volume, ControlValue::Level(v)) => {
                self.set_volume(ip, narrow(key, v)?).await
            }
            (_, value) => Err(SubnetError::InvalidRequest(format!(
                "{key} cannot take {value:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorCode;
    use crate::events::NoopEventEmitter;
    use crate::runtime::TokioSpawner;
    use crate::sonos::test_fixtures::RecordingControl;
    use crate::state::Config;

    #[test]
    fn keys_are_unique_and_balance_is_approximate() {
        let mut keys: Vec<&str> = CONTROLS.iter().map(|c| c.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), CONTROLS.len());

        let approximate: Vec<&str> = CONTROLS
            .iter()
            .filter(|c| c.approximate)
            .map(|c| c.key)
            .collect();
        assert_eq!(approximate, vec!["balance"]);
    }

    #[test]
    fn reads_follow_the_snapshot() {
        let snapshot = DeviceSnapshot {
            volume: Some(42),
            bass: Some(-3),
            mute: Some(true),
            ..Default::default()
        };
        let read = |key| find_control(key).unwrap().value(&snapshot);

        assert_eq!(read("volume"), Some(ControlValue::Level(42)));
        assert_eq!(read("bass"), Some(ControlValue::Level(-3)));
        assert_eq!(read("mute"), Some(ControlValue::Toggle(true)));
        assert_eq!(read("night_mode"), None);
        assert_eq!(read("speech_enhancement"), None);
        assert_eq!(read("balance"), Some(ControlValue::Level(0)));
    }

    #[test]
    fn check_enforces_kind_and_range() {
        let bass = find_control("bass").unwrap();
        assert!(bass.check(ControlValue::Level(10)).is_ok());
        assert!(bass.check(ControlValue::Level(11)).is_err());
        assert!(bass.check(ControlValue::Toggle(true)).is_err());

        let mute = find_control("mute").unwrap();
        assert!(mute.check(ControlValue::Level(1)).is_err());
    }

    #[test]
    fn values_parse_from_text() {
        assert_eq!(
            ControlValue::parse(ControlKind::Toggle, "On").unwrap(),
            ControlValue::Toggle(true)
        );
        assert_eq!(
            ControlValue::parse(ControlKind::Toggle, "off").unwrap(),
            ControlValue::Toggle(false)
        );
        assert!(ControlValue::parse(ControlKind::Toggle, "maybe").is_err());
        assert_eq!(
            ControlValue::parse(EQ_RANGE, "-4").unwrap(),
            ControlValue::Level(-4)
        );
        assert!(ControlValue::parse(EQ_RANGE, "loud").is_err());
    }

    #[tokio::test]
    async fn apply_control_dispatches_to_the_mutation() {
        let control = Arc::new(RecordingControl::default());
        control.add_device("10.0.0.1", "RINCON_X", "Kitchen");
        let coordinator = Coordinator::new(
            control.clone(),
            Config::default(),
            Arc::new(NoopEventEmitter),
            TokioSpawner::current(),
        );
        coordinator.track("10.0.0.1").unwrap();

        coordinator
            .apply_control("10.0.0.1", "night_mode", ControlValue::Toggle(true))
            .await
            .unwrap();
        assert!(control.calls_to("SetEQ")[0]
            .arguments
            .contains("<EQType>NightMode</EQType>"));

        coordinator
            .apply_control("10.0.0.1", "treble", ControlValue::Level(-7))
            .await
            .unwrap();
        assert!(control.calls_to("SetTreble")[0]
            .arguments
            .contains("<DesiredTreble>-7</DesiredTreble>"));

        let err = coordinator
            .apply_control("10.0.0.1", "volume", ControlValue::Toggle(true))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_request");

        let err = coordinator
            .apply_control("10.0.0.1", "hue", ControlValue::Toggle(true))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }
}
