//! Playback control commands for Sonos speakers.
//!
//! Transport control via AVTransport SOAP actions, including retry logic
//! for transient SOAP errors on the calls that start playback.

use crate::protocol_constants::{FAULT_TRANSITION_NOT_AVAILABLE, SLEEP_TIMER_MAX_SECS};
use crate::sonos::didl::format_didl_lite;
use crate::sonos::retry::with_retry;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapRequestBuilder, SoapResult};
use crate::sonos::traits::SonosControl;
use crate::sonos::types::PlayMode;
use crate::sonos::utils::{format_duration, format_sleep_duration};

fn av_transport<'a>(
    control: &'a dyn SonosControl,
    ip: &'a str,
    action: &'a str,
) -> SoapRequestBuilder<'a> {
    SoapRequestBuilder::new(control, ip)
        .service(SonosService::AVTransport)
        .action(action)
        .instance_id()
}

/// Sends `Play` at normal speed, retrying transient faults.
pub async fn play(control: &dyn SonosControl, ip: &str) -> SoapResult<()> {
    with_retry("Play", || av_transport(control, ip, "Play").arg("Speed", "1").send()).await?;
    Ok(())
}

pub async fn pause(control: &dyn SonosControl, ip: &str) -> SoapResult<()> {
    av_transport(control, ip, "Pause").send().await?;
    Ok(())
}

/// Stops playback.
///
/// Fault 701 ("transition not available") means the transport is already
/// stopped and is treated as success.
pub async fn stop(control: &dyn SonosControl, ip: &str) -> SoapResult<()> {
    match av_transport(control, ip, "Stop").send().await {
        Ok(_) => Ok(()),
        Err(e) if e.is_fault_code(FAULT_TRANSITION_NOT_AVAILABLE) => {
            log::debug!("[SOAP] Stop on {} ignored: already stopped", ip);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub async fn next(control: &dyn SonosControl, ip: &str) -> SoapResult<()> {
    av_transport(control, ip, "Next").send().await?;
    Ok(())
}

pub async fn previous(control: &dyn SonosControl, ip: &str) -> SoapResult<()> {
    av_transport(control, ip, "Previous").send().await?;
    Ok(())
}

/// Seeks within the current track to `seconds` from its start.
pub async fn seek(control: &dyn SonosControl, ip: &str, seconds: u32) -> SoapResult<()> {
    av_transport(control, ip, "Seek")
        .arg("Unit", "REL_TIME")
        .arg("Target", format_duration(seconds))
        .send()
        .await?;
    Ok(())
}

pub async fn clear_queue(control: &dyn SonosControl, ip: &str) -> SoapResult<()> {
    av_transport(control, ip, "RemoveAllTracksFromQueue")
        .send()
        .await?;
    Ok(())
}

/// Loads `uri` on the transport and starts playback.
///
/// The URI is sent with a minimal DIDL-Lite music-track item so the Sonos
/// apps have something to display. Both calls retry transient faults.
///
/// # Arguments
/// * `control` - SOAP transport
/// * `ip` - IP address of the speaker (coordinator for grouped speakers)
/// * `uri` - Content URI to play
/// * `title` - Display title; a generic one is used when absent
pub async fn play_uri(
    control: &dyn SonosControl,
    ip: &str,
    uri: &str,
    title: Option<&str>,
) -> SoapResult<()> {
    let metadata = format_didl_lite(uri, title);

    log::info!("[SOAP] Playing {} on {}", uri, ip);

    with_retry("SetAVTransportURI", || {
        av_transport(control, ip, "SetAVTransportURI")
            .arg("CurrentURI", uri)
            .arg("CurrentURIMetaData", metadata.as_str())
            .send()
    })
    .await?;

    play(control, ip).await
}

/// Sets shuffle and repeat together.
pub async fn set_play_mode(control: &dyn SonosControl, ip: &str, mode: PlayMode) -> SoapResult<()> {
    av_transport(control, ip, "SetPlayMode")
        .arg("NewPlayMode", mode.as_upnp())
        .send()
        .await?;
    Ok(())
}

pub async fn set_crossfade(control: &dyn SonosControl, ip: &str, enabled: bool) -> SoapResult<()> {
    av_transport(control, ip, "SetCrossfadeMode")
        .arg("CrossfadeMode", if enabled { "1" } else { "0" })
        .send()
        .await?;
    Ok(())
}

/// Returns true for durations the sleep timer accepts.
#[must_use]
pub fn is_valid_sleep_duration(seconds: u32) -> bool {
    (1..=SLEEP_TIMER_MAX_SECS).contains(&seconds)
}

/// Arms the sleep timer. Callers validate with [`is_valid_sleep_duration`].
pub async fn set_sleep_timer(control: &dyn SonosControl, ip: &str, seconds: u32) -> SoapResult<()> {
    av_transport(control, ip, "ConfigureSleepTimer")
        .arg("NewSleepTimerDuration", format_sleep_duration(seconds))
        .send()
        .await?;
    Ok(())
}

pub async fn clear_sleep_timer(control: &dyn SonosControl, ip: &str) -> SoapResult<()> {
    av_transport(control, ip, "ConfigureSleepTimer")
        .arg("NewSleepTimerDuration", "")
        .send()
        .await?;
    Ok(())
}
