//! General utilities shared across the crate.

use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Address Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Why an address cannot be used as a speaker address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpValidationError {
    #[error("not an IP address: {0}")]
    Malformed(String),

    #[error("IPv6 speakers are not supported: {0}")]
    Ipv6(String),

    #[error("unspecified address: {0}")]
    Unspecified(String),

    #[error("broadcast address: {0}")]
    Broadcast(String),

    #[error("multicast address: {0}")]
    Multicast(String),
}

impl IpValidationError {
    /// Short human-readable reason.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "not an IP address",
            Self::Ipv6(_) => "IPv6 is not supported",
            Self::Unspecified(_) => "unspecified address",
            Self::Broadcast(_) => "broadcast address",
            Self::Multicast(_) => "multicast address",
        }
    }
}

/// Checks that `ip` is a usable unicast IPv4 speaker address.
///
/// Loopback is accepted so a local fake speaker can stand in for hardware.
pub fn validate_speaker_ip(ip: &str) -> Result<IpAddr, IpValidationError> {
    let parsed: IpAddr = ip
        .trim()
        .parse()
        .map_err(|_| IpValidationError::Malformed(ip.to_string()))?;

    let IpAddr::V4(v4) = parsed else {
        return Err(IpValidationError::Ipv6(ip.to_string()));
    };

    if v4.is_unspecified() {
        return Err(IpValidationError::Unspecified(ip.to_string()));
    }
    if v4.is_broadcast() {
        return Err(IpValidationError::Broadcast(ip.to_string()));
    }
    if v4.is_multicast() {
        return Err(IpValidationError::Multicast(ip.to_string()));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_private_and_loopback_addresses() {
        assert!(validate_speaker_ip("192.168.1.20").is_ok());
        assert!(validate_speaker_ip(" 10.0.0.1 ").is_ok());
        assert!(validate_speaker_ip("127.0.0.1").is_ok());
    }

    #[test]
    fn rejects_unusable_addresses() {
        assert!(matches!(
            validate_speaker_ip("not-an-ip"),
            Err(IpValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate_speaker_ip("192.168.1.300"),
            Err(IpValidationError::Malformed(_))
        ));
        assert!(matches!(validate_speaker_ip("::1"), Err(IpValidationError::Ipv6(_))));
        assert!(matches!(
            validate_speaker_ip("0.0.0.0"),
            Err(IpValidationError::Unspecified(_))
        ));
        assert!(matches!(
            validate_speaker_ip("255.255.255.255"),
            Err(IpValidationError::Broadcast(_))
        ));
        assert!(matches!(
            validate_speaker_ip("239.255.255.250"),
            Err(IpValidationError::Multicast(_))
        ));
    }

    #[test]
    fn now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
