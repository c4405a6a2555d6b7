//! DeviceProperties commands: status light and physical button lock.

use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapRequestBuilder, SoapResult};
use crate::sonos::traits::SonosControl;

fn on_off(value: bool) -> &'static str {
    if value {
        "On"
    } else {
        "Off"
    }
}

pub async fn set_status_light(control: &dyn SonosControl, ip: &str, on: bool) -> SoapResult<()> {
    SoapRequestBuilder::new(control, ip)
        .service(SonosService::DeviceProperties)
        .action("SetLEDState")
        .arg("DesiredLEDState", on_off(on))
        .send()
        .await?;
    Ok(())
}

/// Enables or disables the touch controls.
///
/// The device models this as a lock, so `enabled = true` sends `Off`.
pub async fn set_touch_controls(
    control: &dyn SonosControl,
    ip: &str,
    enabled: bool,
) -> SoapResult<()> {
    SoapRequestBuilder::new(control, ip)
        .service(SonosService::DeviceProperties)
        .action("SetButtonLockState")
        .arg("DesiredButtonLockState", on_off(!enabled))
        .send()
        .await?;
    Ok(())
}
