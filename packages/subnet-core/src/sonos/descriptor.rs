//! Device description fetch and normalization.
//!
//! `GET http://{ip}:{port}/xml/device_description.xml` is the only
//! unauthenticated document every Sonos player serves. Its presence (plus the
//! vendor marker) is how a bare address is confirmed to be a speaker.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::protocol_constants::{DEVICE_DESCRIPTION_PATH, SONOS_VENDOR_MARKER};
use crate::sonos::tags::Tags;
use crate::sonos::types::DeviceRecord;
use crate::sonos::utils::{build_sonos_url, normalize_udn};

/// Fetches and parses the device description of `ip`.
///
/// Returns `None` on any network error, timeout, non-200 status, or a body
/// that does not identify as a Sonos device. Never errors.
pub async fn fetch_descriptor(
    client: &Client,
    ip: &str,
    port: u16,
    timeout: Duration,
) -> Option<DeviceRecord> {
    let url = build_sonos_url(ip, port, DEVICE_DESCRIPTION_PATH);

    let response = match client.get(&url).timeout(timeout).send().await {
        Ok(r) => r,
        Err(e) => {
            log::trace!("[Descriptor] {} unreachable: {}", ip, e);
            return None;
        }
    };

    if response.status() != StatusCode::OK {
        log::debug!("[Descriptor] {} answered {}", ip, response.status());
        return None;
    }

    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => {
            log::debug!("[Descriptor] {} body read failed: {}", ip, e);
            return None;
        }
    };

    let record = parse_descriptor(&body, ip, port);
    if record.is_none() {
        log::debug!("[Descriptor] {} is not a Sonos device", ip);
    }
    record
}

/// Normalizes a device description body into a [`DeviceRecord`].
///
/// Returns `None` when the body lacks the vendor marker.
#[must_use]
pub fn parse_descriptor(body: &str, ip: &str, port: u16) -> Option<DeviceRecord> {
    if !body.to_ascii_lowercase().contains(SONOS_VENDOR_MARKER) {
        return None;
    }

    let first = |tags: &[&str]| tags.iter().find_map(|t| body.tag_nonempty(t));

    let udn = body.tag_nonempty("UDN");
    let serial_number = first(&["serialNum", "serialNumber"]);
    let uuid = udn
        .as_deref()
        .map(normalize_udn)
        .filter(|u| !u.is_empty())
        .or_else(|| serial_number.clone())
        .unwrap_or_else(|| ip.to_string());

    Some(DeviceRecord {
        ip: ip.to_string(),
        port,
        uuid,
        udn,
        zone_name: first(&["roomName", "friendlyName"])
            .unwrap_or_else(|| format!("Sonos ({})", ip)),
        model_name: body
            .tag_nonempty("modelName")
            .unwrap_or_else(|| "Unknown".to_string()),
        model_number: body.tag_nonempty("modelNumber"),
        serial_number,
        software_version: first(&["softwareVersion", "swGen"]),
        hardware_version: body.tag_nonempty("hardwareVersion"),
        mac_address: body.tag_nonempty("MACAddress"),
        household_id: body.tag_nonempty("householdId"),
    })
}
