//! RenderingControl commands: volume, mute, EQ and balance.

use crate::protocol_constants::{BALANCE_MAX, BALANCE_MIN, EQ_MAX, EQ_MIN};
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapRequestBuilder, SoapResult};
use crate::sonos::traits::SonosControl;

/// Soundbar EQ settings addressed through `SetEQ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqSetting {
    NightMode,
    /// Speech enhancement.
    DialogLevel,
}

impl EqSetting {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NightMode => "NightMode",
            Self::DialogLevel => "DialogLevel",
        }
    }
}

fn rendering<'a>(
    control: &'a dyn SonosControl,
    ip: &'a str,
    action: &'a str,
) -> SoapRequestBuilder<'a> {
    SoapRequestBuilder::new(control, ip)
        .service(SonosService::RenderingControl)
        .action(action)
        .instance_id()
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Sets the master volume (values above 100 are clamped).
pub async fn set_volume(control: &dyn SonosControl, ip: &str, volume: u8) -> SoapResult<()> {
    rendering(control, ip, "SetVolume")
        .master_channel()
        .arg("DesiredVolume", volume.min(100).to_string())
        .send()
        .await?;
    Ok(())
}

pub async fn set_mute(control: &dyn SonosControl, ip: &str, mute: bool) -> SoapResult<()> {
    rendering(control, ip, "SetMute")
        .master_channel()
        .arg("DesiredMute", flag(mute))
        .send()
        .await?;
    Ok(())
}

/// Sets bass, clamped to -10..=10.
pub async fn set_bass(control: &dyn SonosControl, ip: &str, level: i8) -> SoapResult<()> {
    rendering(control, ip, "SetBass")
        .arg("DesiredBass", level.clamp(EQ_MIN, EQ_MAX).to_string())
        .send()
        .await?;
    Ok(())
}

/// Sets treble, clamped to -10..=10.
pub async fn set_treble(control: &dyn SonosControl, ip: &str, level: i8) -> SoapResult<()> {
    rendering(control, ip, "SetTreble")
        .arg("DesiredTreble", level.clamp(EQ_MIN, EQ_MAX).to_string())
        .send()
        .await?;
    Ok(())
}

pub async fn set_loudness(control: &dyn SonosControl, ip: &str, enabled: bool) -> SoapResult<()> {
    rendering(control, ip, "SetLoudness")
        .master_channel()
        .arg("DesiredLoudness", flag(enabled))
        .send()
        .await?;
    Ok(())
}

/// Sets a soundbar EQ flag. Non-soundbars answer with a fault.
pub async fn set_eq(
    control: &dyn SonosControl,
    ip: &str,
    setting: EqSetting,
    enabled: bool,
) -> SoapResult<()> {
    rendering(control, ip, "SetEQ")
        .arg("EQType", setting.as_str())
        .arg("DesiredValue", flag(enabled))
        .send()
        .await?;
    Ok(())
}

/// Left/right channel volumes for a balance position.
///
/// `balance` runs from -100 (left only) to 100 (right only). The channel
/// on the favoured side keeps `base`; the other is scaled down. This is
/// derived from the current master volume, so repeated adjustments drift.
#[must_use]
pub fn balance_channels(base: u8, balance: i16) -> (u8, u8) {
    let base_wide = i32::from(base.min(100));
    let balance = i32::from(balance.clamp(BALANCE_MIN, BALANCE_MAX));
    // Both results are within 0..=base, so the narrowing cannot truncate.
    let scaled = |pct: i32| (base_wide * pct / 100) as u8;

    if balance < 0 {
        (base.min(100), scaled(100 + balance))
    } else {
        (scaled(100 - balance), base.min(100))
    }
}

/// Pushes left and right channel volumes for `balance` around `base`.
pub async fn set_balance(
    control: &dyn SonosControl,
    ip: &str,
    base: u8,
    balance: i16,
) -> SoapResult<()> {
    let (left, right) = balance_channels(base, balance);
    log::debug!(
        "[SOAP] Balance {} on {}: LF={} RF={}",
        balance,
        ip,
        left,
        right
    );

    for (channel, volume) in [("LF", left), ("RF", right)] {
        rendering(control, ip, "SetVolume")
            .arg("Channel", channel)
            .arg("DesiredVolume", volume.to_string())
            .send()
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonos::test_fixtures::RecordingControl;

    #[tokio::test]
    async fn volume_is_clamped_and_sent_on_master() {
        let control = RecordingControl::default();
        set_volume(&control, "10.0.0.1", 150).await.unwrap();
        assert_eq!(
            control.calls()[0].arguments,
            "<InstanceID>0</InstanceID><Channel>Master</Channel><DesiredVolume>100</DesiredVolume>"
        );
    }

    #[tokio::test]
    async fn eq_levels_are_clamped() {
        let control = RecordingControl::default();
        set_bass(&control, "10.0.0.1", -20).await.unwrap();
        set_treble(&control, "10.0.0.1", 12).await.unwrap();

        let calls = control.calls();
        assert!(calls[0].arguments.contains("<DesiredBass>-10</DesiredBass>"));
        assert!(calls[1].arguments.contains("<DesiredTreble>10</DesiredTreble>"));
    }

    #[tokio::test]
    async fn soundbar_eq_names_the_setting() {
        let control = RecordingControl::default();
        set_eq(&control, "10.0.0.1", EqSetting::DialogLevel, true)
            .await
            .unwrap();
        assert!(control.calls()[0]
            .arguments
            .ends_with("<EQType>DialogLevel</EQType><DesiredValue>1</DesiredValue>"));
    }

    #[test]
    fn balance_scales_the_far_channel() {
        assert_eq!(balance_channels(40, 0), (40, 40));
        assert_eq!(balance_channels(40, -50), (40, 20));
        assert_eq!(balance_channels(40, 50), (20, 40));
        assert_eq!(balance_channels(40, -100), (40, 0));
        assert_eq!(balance_channels(40, 100), (0, 40));
        assert_eq!(balance_channels(40, 250), (0, 40));
    }

    #[tokio::test]
    async fn balance_pushes_both_channels() {
        let control = RecordingControl::default();
        set_balance(&control, "10.0.0.1", 50, 20).await.unwrap();

        let calls = control.calls_to("SetVolume");
        assert_eq!(calls.len(), 2);
        assert!(calls[0]
            .arguments
            .contains("<Channel>LF</Channel><DesiredVolume>40</DesiredVolume>"));
        assert!(calls[1]
            .arguments
            .contains("<Channel>RF</Channel><DesiredVolume>50</DesiredVolume>"));
    }
}
