//! Group coordination commands for Sonos speakers.
//!
//! Handles joining speakers to a coordinator and unjoining them back to
//! standalone mode.

use serde::Serialize;

use crate::sonos::retry::with_retry;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapRequestBuilder, SoapResult};
use crate::sonos::traits::SonosControl;

/// Joins a speaker to a coordinator's group.
///
/// Sets the speaker's transport URI to `x-rincon:{coordinator_uuid}`. The
/// speaker follows whatever the coordinator plays; no `Play` is sent.
/// Transient faults are retried.
///
/// # Arguments
/// * `control` - SOAP transport
/// * `ip` - IP address of the speaker to join
/// * `coordinator_uuid` - UUID of the coordinator speaker (RINCON_xxx format)
pub async fn join(control: &dyn SonosControl, ip: &str, coordinator_uuid: &str) -> SoapResult<()> {
    let group_uri = format!("x-rincon:{}", coordinator_uuid);

    log::info!(
        "[SOAP] Joining {} to coordinator {} (uri: {})",
        ip,
        coordinator_uuid,
        group_uri
    );

    with_retry("SetAVTransportURI", || {
        SoapRequestBuilder::new(control, ip)
            .service(SonosService::AVTransport)
            .action("SetAVTransportURI")
            .instance_id()
            .arg("CurrentURI", group_uri.as_str())
            .arg("CurrentURIMetaData", "")
            .send()
    })
    .await?;

    Ok(())
}

/// Makes a speaker leave its current group and become standalone.
///
/// After this call the speaker is its own coordinator with no members.
pub async fn unjoin(control: &dyn SonosControl, ip: &str) -> SoapResult<()> {
    log::info!("[SOAP] Unjoining {} from its group", ip);

    SoapRequestBuilder::new(control, ip)
        .service(SonosService::AVTransport)
        .action("BecomeCoordinatorOfStandaloneGroup")
        .instance_id()
        .send()
        .await?;

    Ok(())
}

/// Outcome of a multi-member join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinReport {
    /// Members that joined.
    pub joined: Vec<String>,
    /// Members that failed, with the diagnostic.
    pub failures: Vec<(String, String)>,
}

impl JoinReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Joins every member in turn; failures are logged and reported, never fatal.
pub async fn join_all_members(
    control: &dyn SonosControl,
    members: &[String],
    coordinator_uuid: &str,
) -> JoinReport {
    let mut report = JoinReport::default();

    for ip in members {
        match join(control, ip, coordinator_uuid).await {
            Ok(()) => report.joined.push(ip.clone()),
            Err(e) => {
                log::warn!("[SOAP] Failed to join {} to {}: {}", ip, coordinator_uuid, e);
                report.failures.push((ip.clone(), e.to_string()));
            }
        }
    }

    report
}
