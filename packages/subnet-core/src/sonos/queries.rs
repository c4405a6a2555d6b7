//! Read-side queries used by the poller.
//!
//! One poll of one device fans out six independent sub-queries. Each
//! returns an explicit `SoapResult` holding a [`PartialSnapshot`]; a failed
//! sub-query contributes nothing and never short-circuits the others.
//! Every partial writes a disjoint set of snapshot fields, so merging is
//! order-independent.

use std::str::FromStr;

use futures::join;

use crate::sonos::didl::track_from_position_info;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapError, SoapRequestBuilder, SoapResult};
use crate::sonos::tags::{parse_bool, Tags};
use crate::sonos::traits::SonosControl;
use crate::sonos::types::{DeviceSnapshot, GroupMembership, PlayMode, TrackInfo, TransportState};
use crate::sonos::zone_groups::resolve_group;
use crate::utils::now_millis;

/// Fields contributed by one sub-query.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialSnapshot {
    Transport {
        state: Option<TransportState>,
        status: Option<String>,
        play_mode: Option<PlayMode>,
        crossfade: Option<bool>,
    },
    Position(TrackInfo),
    Volume {
        volume: Option<u8>,
        mute: Option<bool>,
    },
    Eq {
        bass: Option<i8>,
        treble: Option<i8>,
        loudness: Option<bool>,
        night_mode: Option<bool>,
        speech_enhancement: Option<bool>,
    },
    Settings {
        status_light: Option<bool>,
        touch_controls: Option<bool>,
    },
    Topology(GroupMembership),
}

impl PartialSnapshot {
    /// Writes this partial's fields into `snapshot`.
    pub fn apply(self, snapshot: &mut DeviceSnapshot) {
        match self {
            Self::Transport {
                state,
                status,
                play_mode,
                crossfade,
            } => {
                snapshot.transport_state = state;
                snapshot.transport_status = status;
                snapshot.play_mode = play_mode;
                snapshot.crossfade = crossfade;
            }
            Self::Position(track) => snapshot.track = track,
            Self::Volume { volume, mute } => {
                snapshot.volume = volume;
                snapshot.mute = mute;
            }
            Self::Eq {
                bass,
                treble,
                loudness,
                night_mode,
                speech_enhancement,
            } => {
                snapshot.bass = bass;
                snapshot.treble = treble;
                snapshot.loudness = loudness;
                snapshot.night_mode = night_mode;
                snapshot.speech_enhancement = speech_enhancement;
            }
            Self::Settings {
                status_light,
                touch_controls,
            } => {
                snapshot.status_light = status_light;
                snapshot.touch_controls = touch_controls;
            }
            Self::Topology(group) => snapshot.group = group,
        }
    }
}

/// Builds a snapshot from sub-query results.
///
/// Failed sub-queries leave their fields at the default.
#[must_use]
pub fn merge_partials(
    partials: impl IntoIterator<Item = SoapResult<PartialSnapshot>>,
    polled_at: u64,
) -> DeviceSnapshot {
    let mut snapshot = DeviceSnapshot {
        available: true,
        polled_at,
        ..Default::default()
    };
    for partial in partials.into_iter().flatten() {
        partial.apply(&mut snapshot);
    }
    snapshot
}

/// Polls one device.
///
/// `GetTransportInfo` is the liveness anchor: if it fails the whole poll
/// fails with its error. Any other sub-query failure only leaves fields
/// absent.
///
/// # Arguments
/// * `control` - SOAP transport
/// * `ip` - Address of the device
/// * `uuid` - The device's own RINCON id, used to find its topology block
pub async fn poll_device(
    control: &dyn SonosControl,
    ip: &str,
    uuid: &str,
) -> SoapResult<DeviceSnapshot> {
    let (transport, position, volume, eq, settings, topology) = join!(
        query_transport(control, ip),
        query_position(control, ip),
        query_volume(control, ip),
        query_eq(control, ip),
        query_settings(control, ip),
        query_topology(control, ip, uuid),
    );

    let transport = transport?;

    for (name, result) in [
        ("position", &position),
        ("volume", &volume),
        ("eq", &eq),
        ("settings", &settings),
        ("topology", &topology),
    ] {
        if let Err(e) = result {
            log::debug!("[Coordinator] {} {} query failed: {}", ip, name, e);
        }
    }

    Ok(merge_partials(
        [Ok(transport), position, volume, eq, settings, topology],
        now_millis(),
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Sub-queries
// ─────────────────────────────────────────────────────────────────────────────

fn request<'a>(
    control: &'a dyn SonosControl,
    ip: &'a str,
    service: SonosService,
    action: &'a str,
) -> SoapRequestBuilder<'a> {
    SoapRequestBuilder::new(control, ip)
        .service(service)
        .action(action)
        .instance_id()
}

fn parse_tag<T: FromStr>(body: &str, tag: &str) -> Option<T> {
    body.tag(tag).and_then(|v| v.parse().ok())
}

/// Fails with the first error only when every call in the group failed.
fn all_failed<const N: usize>(results: [&SoapResult<String>; N]) -> Option<SoapError> {
    if results.iter().all(|r| r.is_err()) {
        results.into_iter().find_map(|r| r.clone().err())
    } else {
        None
    }
}

/// Transport state (anchor), play mode and crossfade.
pub async fn query_transport(control: &dyn SonosControl, ip: &str) -> SoapResult<PartialSnapshot> {
    let (info, settings, crossfade) = join!(
        request(control, ip, SonosService::AVTransport, "GetTransportInfo").send(),
        request(control, ip, SonosService::AVTransport, "GetTransportSettings").send(),
        request(control, ip, SonosService::AVTransport, "GetCrossfadeMode").send(),
    );
    let info = info?;

    Ok(PartialSnapshot::Transport {
        state: info
            .tag_nonempty("CurrentTransportState")
            .map(|s| TransportState::from_upnp(&s)),
        status: info.tag_nonempty("CurrentTransportStatus"),
        play_mode: settings
            .ok()
            .and_then(|b| b.tag_nonempty("PlayMode"))
            .map(|m| PlayMode::from_upnp(&m)),
        crossfade: crossfade
            .ok()
            .and_then(|b| b.tag_nonempty("CrossfadeMode"))
            .map(|v| parse_bool(&v)),
    })
}

/// Current track and position.
pub async fn query_position(control: &dyn SonosControl, ip: &str) -> SoapResult<PartialSnapshot> {
    let body = request(control, ip, SonosService::AVTransport, "GetPositionInfo")
        .send()
        .await?;
    Ok(PartialSnapshot::Position(track_from_position_info(&body)))
}

/// Master volume and mute.
pub async fn query_volume(control: &dyn SonosControl, ip: &str) -> SoapResult<PartialSnapshot> {
    let (volume, mute) = join!(
        request(control, ip, SonosService::RenderingControl, "GetVolume")
            .master_channel()
            .send(),
        request(control, ip, SonosService::RenderingControl, "GetMute")
            .master_channel()
            .send(),
    );
    if let Some(e) = all_failed([&volume, &mute]) {
        return Err(e);
    }

    Ok(PartialSnapshot::Volume {
        volume: volume
            .ok()
            .and_then(|b| parse_tag::<u32>(&b, "CurrentVolume"))
            .map(|v| v.min(100) as u8),
        mute: mute
            .ok()
            .and_then(|b| b.tag_nonempty("CurrentMute"))
            .map(|v| parse_bool(&v)),
    })
}

/// Bass, treble, loudness, and the soundbar-only EQ flags.
pub async fn query_eq(control: &dyn SonosControl, ip: &str) -> SoapResult<PartialSnapshot> {
    let rc = SonosService::RenderingControl;
    let (bass, treble, loudness, night, dialog) = join!(
        request(control, ip, rc, "GetBass").send(),
        request(control, ip, rc, "GetTreble").send(),
        request(control, ip, rc, "GetLoudness").master_channel().send(),
        request(control, ip, rc, "GetEQ").arg("EQType", "NightMode").send(),
        request(control, ip, rc, "GetEQ").arg("EQType", "DialogLevel").send(),
    );
    if let Some(e) = all_failed([&bass, &treble, &loudness, &night, &dialog]) {
        return Err(e);
    }

    let flag = |result: SoapResult<String>, tag: &str| {
        result
            .ok()
            .and_then(|b| b.tag_nonempty(tag))
            .map(|v| parse_bool(&v))
    };

    Ok(PartialSnapshot::Eq {
        bass: bass.ok().and_then(|b| parse_tag(&b, "CurrentBass")),
        treble: treble.ok().and_then(|b| parse_tag(&b, "CurrentTreble")),
        loudness: flag(loudness, "CurrentLoudness"),
        night_mode: flag(night, "CurrentValue"),
        speech_enhancement: flag(dialog, "CurrentValue"),
    })
}

/// Status light and button lock.
pub async fn query_settings(control: &dyn SonosControl, ip: &str) -> SoapResult<PartialSnapshot> {
    let dp = SonosService::DeviceProperties;
    let (led, lock) = join!(
        SoapRequestBuilder::new(control, ip)
            .service(dp)
            .action("GetLEDState")
            .send(),
        SoapRequestBuilder::new(control, ip)
            .service(dp)
            .action("GetButtonLockState")
            .send(),
    );
    if let Some(e) = all_failed([&led, &lock]) {
        return Err(e);
    }

    Ok(PartialSnapshot::Settings {
        status_light: led
            .ok()
            .and_then(|b| b.tag_nonempty("CurrentLEDState"))
            .map(|v| v.eq_ignore_ascii_case("On")),
        touch_controls: lock
            .ok()
            .and_then(|b| b.tag_nonempty("CurrentButtonLockState"))
            .map(|v| !v.eq_ignore_ascii_case("On")),
    })
}

/// Group membership from the household topology.
pub async fn query_topology(
    control: &dyn SonosControl,
    ip: &str,
    uuid: &str,
) -> SoapResult<PartialSnapshot> {
    let body = SoapRequestBuilder::new(control, ip)
        .service(SonosService::ZoneGroupTopology)
        .action("GetZoneGroupState")
        .send()
        .await?;
    Ok(PartialSnapshot::Topology(resolve_group(&body, uuid, ip)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sonos::test_fixtures::{zone_group_state_response, RecordingControl};
    use crate::sonos::types::RepeatMode;

    fn scripted_speaker() -> RecordingControl {
        let control = RecordingControl::default();
        control.respond(
            "GetTransportInfo",
            "<CurrentTransportState>PLAYING</CurrentTransportState><CurrentTransportStatus>OK</CurrentTransportStatus><CurrentSpeed>1</CurrentSpeed>",
        );
        control.respond("GetTransportSettings", "<PlayMode>SHUFFLE_NOREPEAT</PlayMode>");
        control.respond("GetCrossfadeMode", "<CrossfadeMode>1</CrossfadeMode>");
        control.respond(
            "GetPositionInfo",
            "<Track>2</Track><TrackDuration>0:03:00</TrackDuration><TrackMetaData>&lt;dc:title&gt;Song&lt;/dc:title&gt;</TrackMetaData><TrackURI>x-file-cifs://nas/a.mp3</TrackURI><RelTime>0:00:30</RelTime>",
        );
        control.respond("GetVolume", "<CurrentVolume>35</CurrentVolume>");
        control.respond("GetMute", "<CurrentMute>0</CurrentMute>");
        control.respond("GetBass", "<CurrentBass>-3</CurrentBass>");
        control.respond("GetTreble", "<CurrentTreble>4</CurrentTreble>");
        control.respond("GetLoudness", "<CurrentLoudness>1</CurrentLoudness>");
        control.respond("GetLEDState", "<CurrentLEDState>On</CurrentLEDState>");
        control.respond(
            "GetButtonLockState",
            "<CurrentButtonLockState>Off</CurrentButtonLockState>",
        );
        control.respond("GetZoneGroupState", zone_group_state_response());
        control
    }

    #[tokio::test]
    async fn full_poll_populates_every_field() {
        let control = scripted_speaker();
        let snapshot = poll_device(&control, "10.0.0.2", "RINCON_Y").await.unwrap();

        assert!(snapshot.available);
        assert_eq!(snapshot.transport_state, Some(TransportState::Playing));
        assert_eq!(snapshot.transport_status.as_deref(), Some("OK"));
        assert_eq!(snapshot.shuffle(), Some(true));
        assert_eq!(snapshot.repeat(), Some(RepeatMode::Off));
        assert_eq!(snapshot.crossfade, Some(true));
        assert_eq!(snapshot.track.title.as_deref(), Some("Song"));
        assert_eq!(snapshot.track.position_secs, Some(30));
        assert_eq!(snapshot.volume, Some(35));
        assert_eq!(snapshot.mute, Some(false));
        assert_eq!(snapshot.bass, Some(-3));
        assert_eq!(snapshot.treble, Some(4));
        assert_eq!(snapshot.loudness, Some(true));
        assert_eq!(snapshot.status_light, Some(true));
        assert_eq!(snapshot.touch_controls, Some(true));
        assert!(!snapshot.group.is_coordinator);
        assert_eq!(snapshot.group.members, vec!["10.0.0.1", "10.0.0.2"]);
        assert!(snapshot.polled_at > 0);
    }

    #[tokio::test]
    async fn soundbar_flags_absent_when_device_faults() {
        let control = scripted_speaker();
        control.fail_for("10.0.0.2", "GetEQ", SoapError::Fault("402 (Invalid Args)".into()));

        let snapshot = poll_device(&control, "10.0.0.2", "RINCON_Y").await.unwrap();
        assert_eq!(snapshot.night_mode, None);
        assert_eq!(snapshot.speech_enhancement, None);
        assert_eq!(snapshot.bass, Some(-3));
    }

    #[tokio::test]
    async fn eq_flags_read_current_value() {
        let control = scripted_speaker();
        control.respond("GetEQ", "<CurrentValue>1</CurrentValue>");

        let snapshot = poll_device(&control, "10.0.0.2", "RINCON_Y").await.unwrap();
        assert_eq!(snapshot.night_mode, Some(true));
        assert_eq!(snapshot.speech_enhancement, Some(true));

        let eq_calls = control.calls_to("GetEQ");
        assert_eq!(eq_calls.len(), 2);
        assert!(eq_calls.iter().any(|c| c.arguments.contains("<EQType>NightMode</EQType>")));
        assert!(eq_calls.iter().any(|c| c.arguments.contains("<EQType>DialogLevel</EQType>")));
    }

    #[tokio::test]
    async fn transport_failure_fails_the_poll() {
        let control = scripted_speaker();
        control.fail_for(
            "10.0.0.2",
            "GetTransportInfo",
            SoapError::Timeout(Duration::from_secs(10)),
        );

        let result = poll_device(&control, "10.0.0.2", "RINCON_Y").await;
        assert_eq!(result, Err(SoapError::Timeout(Duration::from_secs(10))));
    }

    #[tokio::test]
    async fn secondary_failures_leave_fields_absent() {
        let control = scripted_speaker();
        let down = SoapError::HttpStatus(500, String::new());
        control.fail_for("10.0.0.2", "GetVolume", down.clone());
        control.fail_for("10.0.0.2", "GetMute", down.clone());
        control.fail_for("10.0.0.2", "GetZoneGroupState", down.clone());
        control.fail_for("10.0.0.2", "GetTransportSettings", down);

        let snapshot = poll_device(&control, "10.0.0.2", "RINCON_Y").await.unwrap();
        assert!(snapshot.available);
        assert_eq!(snapshot.volume, None);
        assert_eq!(snapshot.mute, None);
        assert_eq!(snapshot.play_mode, None);
        assert_eq!(snapshot.crossfade, Some(true));
        assert_eq!(snapshot.group, GroupMembership::default());
    }

    #[test]
    fn merge_is_order_independent() {
        let partials = || {
            vec![
                Ok(PartialSnapshot::Volume {
                    volume: Some(10),
                    mute: Some(true),
                }),
                Err(SoapError::Timeout(Duration::from_secs(1))),
                Ok(PartialSnapshot::Settings {
                    status_light: Some(false),
                    touch_controls: Some(true),
                }),
                Ok(PartialSnapshot::Topology(GroupMembership {
                    is_coordinator: false,
                    members: vec!["a".into(), "b".into()],
                })),
            ]
        };

        let forward = merge_partials(partials(), 7);
        let reverse = merge_partials(partials().into_iter().rev(), 7);
        assert_eq!(forward, reverse);
        assert_eq!(forward.volume, Some(10));
        assert_eq!(forward.status_light, Some(false));
    }
}
