//! Scripted network doubles shared by test modules.
//!
//! [`RecordingControl`] answers SOAP calls from canned bodies and records
//! every call it sees. It also serves device descriptors, so one instance
//! stands in for a whole subnet of speakers.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapError, SoapResult};
use crate::sonos::traits::{DescriptorSource, SonosControl};
use crate::sonos::types::DeviceRecord;

/// One call seen by [`RecordingControl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub ip: String,
    pub service: SonosService,
    pub action: String,
    pub arguments: String,
}

/// Scripted failure for one action, optionally limited to a number of calls.
struct ScriptedFailure {
    error: SoapError,
    remaining: Option<usize>,
}

#[derive(Default)]
pub struct RecordingControl {
    calls: Mutex<Vec<RecordedCall>>,
    /// Keyed by `(ip, action)`; an empty ip matches every device.
    responses: Mutex<HashMap<(String, String), String>>,
    failures: Mutex<HashMap<(String, String), ScriptedFailure>>,
    unreachable: Mutex<HashSet<String>>,
    devices: Mutex<HashMap<String, DeviceRecord>>,
}

impl RecordingControl {
    /// Answers `action` on every device with `body`.
    pub fn respond(&self, action: &str, body: impl Into<String>) {
        self.respond_for("", action, body);
    }

    /// Answers `action` on `ip` with `body`.
    pub fn respond_for(&self, ip: &str, action: &str, body: impl Into<String>) {
        self.responses
            .lock()
            .insert((ip.to_string(), action.to_string()), body.into());
    }

    /// Fails `action` on `ip` with `error` until cleared.
    pub fn fail_for(&self, ip: &str, action: &str, error: SoapError) {
        self.failures.lock().insert(
            (ip.to_string(), action.to_string()),
            ScriptedFailure {
                error,
                remaining: None,
            },
        );
    }

    /// Fails `action` on every device `times` times, then succeeds.
    pub fn fail_times(&self, action: &str, times: usize, error: SoapError) {
        self.failures.lock().insert(
            (String::new(), action.to_string()),
            ScriptedFailure {
                error,
                remaining: Some(times),
            },
        );
    }

    /// Removes every scripted failure for `ip`.
    pub fn clear_failures(&self, ip: &str) {
        self.failures.lock().retain(|(k, _), _| k != ip);
    }

    /// Makes every call to `ip` time out and its descriptor vanish.
    pub fn set_unreachable(&self, ip: &str, unreachable: bool) {
        let mut set = self.unreachable.lock();
        if unreachable {
            set.insert(ip.to_string());
        } else {
            set.remove(ip);
        }
    }

    /// Registers a speaker so its descriptor can be fetched.
    pub fn add_device(&self, ip: &str, uuid: &str, zone_name: &str) {
        self.devices
            .lock()
            .insert(ip.to_string(), record(ip, uuid, zone_name));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Calls of `action`, in order.
    pub fn calls_to(&self, action: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.action == action)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn scripted_failure(&self, ip: &str, action: &str) -> Option<SoapError> {
        let mut failures = self.failures.lock();
        for key in [
            (ip.to_string(), action.to_string()),
            (String::new(), action.to_string()),
        ] {
            let Some(failure) = failures.get_mut(&key) else {
                continue;
            };
            let error = failure.error.clone();
            match failure.remaining.as_mut() {
                Some(0) => {
                    failures.remove(&key);
                    return None;
                }
                Some(n) => {
                    *n -= 1;
                    if *n == 0 {
                        failures.remove(&key);
                    }
                    return Some(error);
                }
                None => return Some(error),
            }
        }
        None
    }
}

#[async_trait]
impl SonosControl for RecordingControl {
    async fn call(
        &self,
        ip: &str,
        service: SonosService,
        action: &str,
        arguments: &str,
    ) -> SoapResult<String> {
        self.calls.lock().push(RecordedCall {
            ip: ip.to_string(),
            service,
            action: action.to_string(),
            arguments: arguments.to_string(),
        });

        if self.unreachable.lock().contains(ip) {
            return Err(SoapError::Timeout(Duration::from_secs(1)));
        }
        if let Some(error) = self.scripted_failure(ip, action) {
            return Err(error);
        }

        let responses = self.responses.lock();
        let body = responses
            .get(&(ip.to_string(), action.to_string()))
            .or_else(|| responses.get(&(String::new(), action.to_string())))
            .cloned()
            .unwrap_or_else(|| format!("<u:{action}Response></u:{action}Response>"));
        Ok(body)
    }
}

#[async_trait]
impl DescriptorSource for RecordingControl {
    async fn fetch_descriptor(&self, ip: &str, _timeout: Duration) -> Option<DeviceRecord> {
        if self.unreachable.lock().contains(ip) {
            return None;
        }
        self.devices.lock().get(ip).cloned()
    }
}

/// Minimal record for `ip`.
pub fn record(ip: &str, uuid: &str, zone_name: &str) -> DeviceRecord {
    DeviceRecord {
        ip: ip.to_string(),
        port: 1400,
        uuid: uuid.to_string(),
        udn: Some(format!("uuid:{uuid}")),
        zone_name: zone_name.to_string(),
        model_name: "Sonos One".to_string(),
        model_number: Some("S18".to_string()),
        serial_number: None,
        software_version: None,
        hardware_version: None,
        mac_address: None,
        household_id: None,
    }
}

/// `GetZoneGroupState` response for one group X+Y (X coordinates) and a
/// standalone Z.
pub fn zone_group_state_response() -> String {
    let state = r#"<ZoneGroupState><ZoneGroups><ZoneGroup Coordinator="RINCON_X" ID="RINCON_X:1"><ZoneGroupMember UUID="RINCON_X" Location="http://10.0.0.1:1400/xml/device_description.xml" ZoneName="Kitchen"/><ZoneGroupMember UUID="RINCON_Y" Location="http://10.0.0.2:1400/xml/device_description.xml" ZoneName="Dining"/></ZoneGroup><ZoneGroup Coordinator="RINCON_Z" ID="RINCON_Z:7"><ZoneGroupMember UUID="RINCON_Z" Location="http://10.0.0.3:1400/xml/device_description.xml" ZoneName="Office"/></ZoneGroup></ZoneGroups></ZoneGroupState>"#;
    format!(
        "<u:GetZoneGroupStateResponse><ZoneGroupState>{}</ZoneGroupState></u:GetZoneGroupStateResponse>",
        crate::sonos::utils::escape_xml(state)
    )
}
