//! Low-level SOAP protocol implementation for UPnP/Sonos communication.
//!
//! This module handles envelope building, HTTP transport and fault
//! detection. Every command in the crate funnels through
//! [`send_soap_request`]; nothing above this layer builds HTTP requests.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use thiserror::Error;

use super::services::SonosService;
use super::tags::Tags;
use super::traits::SonosControl;
use super::utils::{build_sonos_url, escape_xml};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during SOAP operations with Sonos speakers.
///
/// Every variant carries only a short diagnostic string. Callers treat any
/// error as "the command failed" and keep the text for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SoapError {
    /// Connection refused, DNS/route failure or a broken response body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request did not complete within its timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Speaker answered with a non-200 status and no SOAP fault.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// Speaker returned a SOAP fault; the payload is the UPnP error code or faultstring.
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// An expected field was missing from an otherwise successful response.
    #[error("missing field in response: {0}")]
    Parse(String),
}

/// Convenient Result alias for SOAP operations.
pub type SoapResult<T> = Result<T, SoapError>;

impl SoapError {
    /// Returns true if this error is transient and the operation should be retried.
    ///
    /// Transient Sonos SOAP fault codes:
    /// - 701: Transition not available (device changing states)
    /// - 714: Illegal seek target (previous source still loading)
    /// - 716: Resource not found (device busy initializing)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SoapError::Fault(msg) => {
                msg.contains("701")
                    || msg.contains("714")
                    || msg.contains("716")
                    || msg.to_lowercase().contains("transition")
            }
            SoapError::Timeout(_) => true,
            _ => false,
        }
    }

    /// Returns true for a UPnP fault carrying `code`.
    #[must_use]
    pub fn is_fault_code(&self, code: &str) -> bool {
        matches!(self, SoapError::Fault(msg) if msg.contains(code))
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            SoapError::Timeout(timeout)
        } else if err.is_connect() {
            SoapError::Transport("connection failed".into())
        } else {
            SoapError::Transport(err.to_string())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the SOAP envelope for `action` on `service`.
///
/// `arguments` is inserted verbatim, so values must already be escaped.
/// The envelope must be a single line: Sonos rejects XML with whitespace
/// before the root element.
#[must_use]
pub fn build_envelope(service: SonosService, action: &str, arguments: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{action} xmlns:u="{urn}">{arguments}</u:{action}></s:Body></s:Envelope>"#,
        action = action,
        urn = service.urn(),
        arguments = arguments,
    )
}

/// Renders ordered `(name, value)` pairs as escaped argument elements.
#[must_use]
pub fn render_arguments<K: AsRef<str>, V: AsRef<str>>(args: &[(K, V)]) -> String {
    let mut out = String::new();
    for (k, v) in args {
        let k = k.as_ref();
        out.push_str(&format!("<{k}>{}</{k}>", escape_xml(v.as_ref())));
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Request/Response
// ─────────────────────────────────────────────────────────────────────────────

/// Sends a SOAP request to a Sonos speaker.
///
/// Success is an HTTP 200 response without a SOAP fault body. Any other
/// status, transport failure or timeout becomes a [`SoapError`]; nothing
/// panics and nothing is retried here.
///
/// # Arguments
/// * `client` - Shared HTTP client
/// * `ip` - IP address of the Sonos speaker
/// * `port` - Control port (1400 on real hardware)
/// * `service` - Target service; selects URN and control path
/// * `action` - The SOAP action name (e.g., "Play", "GetVolume")
/// * `arguments` - Pre-rendered argument XML
/// * `timeout` - Deadline for the whole request
pub async fn send_soap_request(
    client: &Client,
    ip: &str,
    port: u16,
    service: SonosService,
    action: &str,
    arguments: &str,
    timeout: Duration,
) -> SoapResult<String> {
    let url = build_sonos_url(ip, port, service.control_path());
    let body = build_envelope(service, action, arguments);

    log::debug!("[SOAP] {} -> {} (body: {} bytes)", action, url, body.len());

    let start = Instant::now();
    let res = client
        .post(&url)
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .header("SOAPACTION", format!("\"{}#{}\"", service.urn(), action))
        .body(body)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| SoapError::from_reqwest(e, timeout))?;

    let status = res.status();
    let response_text = res
        .text()
        .await
        .map_err(|e| SoapError::from_reqwest(e, timeout))?;

    log::debug!(
        "[SOAP] {} on {} completed in {:?}: {}",
        action,
        ip,
        start.elapsed(),
        status
    );

    // Faults usually arrive with a 500 status; check the body first so the
    // UPnP error code survives into the diagnostic.
    if let Some(fault) = extract_fault(&response_text) {
        return Err(SoapError::Fault(fault));
    }

    if status != StatusCode::OK {
        return Err(SoapError::HttpStatus(status.as_u16(), truncate(&response_text)));
    }

    Ok(response_text)
}

/// Extracts `errorCode` (preferred) or `faultstring` from a SOAP fault body.
fn extract_fault(xml: &str) -> Option<String> {
    if xml.tag("faultcode").is_none() && xml.tag("faultstring").is_none() {
        return None;
    }
    let code = xml.tag_nonempty("errorCode");
    let text = xml.tag_nonempty("faultstring");
    Some(match (code, text) {
        (Some(code), Some(text)) => format!("{} ({})", code, text),
        (Some(code), None) => code,
        (None, Some(text)) => text,
        (None, None) => "Unknown SOAP fault".to_string(),
    })
}

fn truncate(text: &str) -> String {
    const MAX: usize = 120;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Request Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for constructing and sending SOAP requests through a [`SonosControl`].
///
/// # Example
/// ```ignore
/// let response = SoapRequestBuilder::new(control, "192.168.1.100")
///     .service(SonosService::AVTransport)
///     .action("Play")
///     .instance_id()
///     .arg("Speed", "1")
///     .send()
///     .await?;
/// ```
pub struct SoapRequestBuilder<'a> {
    control: &'a dyn SonosControl,
    ip: &'a str,
    service: Option<SonosService>,
    action: Option<&'a str>,
    args: Vec<(&'a str, String)>,
}

impl<'a> SoapRequestBuilder<'a> {
    /// Creates a new SOAP request builder.
    #[must_use]
    pub fn new(control: &'a dyn SonosControl, ip: &'a str) -> Self {
        Self {
            control,
            ip,
            service: None,
            action: None,
            args: Vec::new(),
        }
    }

    /// Sets the Sonos service for this request.
    #[must_use]
    pub fn service(mut self, service: SonosService) -> Self {
        self.service = Some(service);
        self
    }

    /// Sets the SOAP action name.
    #[must_use]
    pub fn action(mut self, action: &'a str) -> Self {
        self.action = Some(action);
        self
    }

    /// Adds an argument; arguments keep insertion order.
    #[must_use]
    pub fn arg(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.args.push((key, value.into()));
        self
    }

    /// Adds the standard InstanceID="0" argument used by most Sonos actions.
    #[must_use]
    pub fn instance_id(self) -> Self {
        self.arg("InstanceID", "0")
    }

    /// Adds `Channel=Master`.
    #[must_use]
    pub fn master_channel(self) -> Self {
        self.arg("Channel", "Master")
    }

    /// Sends the SOAP request and returns the response body.
    ///
    /// # Errors
    /// Returns `SoapError` if the service or action is not set, or if the
    /// request fails.
    pub async fn send(self) -> SoapResult<String> {
        let service = self
            .service
            .ok_or_else(|| SoapError::Transport("SoapRequestBuilder: service not set".into()))?;
        let action = self
            .action
            .ok_or_else(|| SoapError::Transport("SoapRequestBuilder: action not set".into()))?;

        let arguments = render_arguments(&self.args);
        self.control.call(self.ip, service, action, &arguments).await
    }

    /// Returns the request parts without sending (for testing).
    #[cfg(test)]
    pub fn into_parts(self) -> Option<(SonosService, &'a str, Vec<(&'a str, String)>)> {
        let service = self.service?;
        let action = self.action?;
        Some((service, action, self.args))
    }
}
