//! Small helpers shared by the Sonos protocol modules.

use quick_xml::events::BytesStart;

// ─────────────────────────────────────────────────────────────────────────────
// URLs
// ─────────────────────────────────────────────────────────────────────────────

/// Builds `http://{ip}:{port}{path}`.
#[must_use]
pub fn build_sonos_url(ip: &str, port: u16, path: &str) -> String {
    format!("http://{}:{}{}", ip, port, path)
}

/// Extracts the host portion of a UPnP Location URL.
///
/// `http://192.168.1.100:1400/xml/device_description.xml` → `192.168.1.100`
#[must_use]
pub fn extract_ip_from_location(location: &str) -> Option<String> {
    let stripped = location.strip_prefix("http://")?;
    let host_end = stripped.find([':', '/']).unwrap_or(stripped.len());
    let host = &stripped[..host_end];
    (!host.is_empty()).then(|| host.to_string())
}

/// Gets an attribute value from an XML element.
pub fn get_xml_attr(elem: &BytesStart, attr_name: &[u8]) -> Option<String> {
    elem.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == attr_name)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// XML Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Escapes the five XML special characters.
///
/// Used for SOAP argument values and DIDL-Lite fields.
#[must_use]
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ─────────────────────────────────────────────────────────────────────────────
// Durations
// ─────────────────────────────────────────────────────────────────────────────

/// Parses `H:MM:SS` or `MM:SS` into seconds.
///
/// Anything else (including `NOT_IMPLEMENTED` and empty strings) yields 0.
#[must_use]
pub fn parse_duration(value: &str) -> u32 {
    let parts: Option<Vec<u64>> = value
        .trim()
        .split(':')
        .map(|p| p.trim().parse::<u64>().ok())
        .collect();

    let total = match parts.as_deref() {
        Some([h, m, s]) => h
            .saturating_mul(3600)
            .saturating_add(m.saturating_mul(60))
            .saturating_add(*s),
        Some([m, s]) => m.saturating_mul(60).saturating_add(*s),
        _ => 0,
    };
    u32::try_from(total).unwrap_or(0)
}

/// Formats seconds as `H:MM:SS`, the form AVTransport `Seek` expects.
#[must_use]
pub fn format_duration(seconds: u32) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Formats seconds as zero-padded `HH:MM:SS` for the sleep timer.
#[must_use]
pub fn format_sleep_duration(seconds: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Strips the `uuid:` prefix and any `::urn:...` suffix from a UDN.
///
/// `uuid:RINCON_000E58A0123401400` → `RINCON_000E58A0123401400`, which is
/// the form zone group topology uses for member and coordinator ids.
#[must_use]
pub fn normalize_udn(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_prefix = trimmed.strip_prefix("uuid:").unwrap_or(trimmed);
    match without_prefix.find("::") {
        Some(idx) => without_prefix[..idx].to_string(),
        None => without_prefix.to_string(),
    }
}
