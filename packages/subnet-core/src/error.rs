//! Centralized error types for the subnet core library.
//!
//! Layer errors ([`SoapError`], [`ScanError`], [`IpValidationError`]) stay
//! close to the code that raises them. [`SubnetError`] is what the
//! coordinator's public surface returns.

use serde::Serialize;
use thiserror::Error;

use crate::sonos::discovery::ScanError;
use crate::sonos::soap::SoapError;
use crate::utils::IpValidationError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for SoapError {
    fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_failed",
            Self::Timeout(_) => "request_timeout",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::Fault(_) => "soap_fault",
            Self::Parse(_) => "soap_parse_error",
        }
    }
}

impl ErrorCode for ScanError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidSubnet(_) => "invalid_subnet",
            Self::SubnetTooWide { .. } => "subnet_too_wide",
            Self::InvalidAddress(_) => "invalid_address",
        }
    }
}

impl ErrorCode for IpValidationError {
    fn code(&self) -> &'static str {
        "invalid_ip"
    }
}

/// Application-wide error type.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum SubnetError {
    /// SOAP request to a speaker failed.
    #[error("SOAP request failed: {0}")]
    Soap(String),

    /// Subnet or address rejected before scanning.
    #[error("Scan rejected: {0}")]
    Scan(String),

    /// Address is not tracked by the coordinator.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Tracked device did not answer a descriptor fetch.
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    /// Caller sent an invalid or out-of-range value.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid IP address for a speaker.
    #[error("Invalid IP: {0}")]
    InvalidIp(String),

    /// Configuration value rejected by validation.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error (HTTP client construction and similar).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorCode for SubnetError {
    fn code(&self) -> &'static str {
        match self {
            Self::Soap(_) => "soap_error",
            Self::Scan(_) => "scan_rejected",
            Self::DeviceNotFound(_) => "device_not_found",
            Self::Unreachable(_) => "device_unreachable",
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidIp(_) => "invalid_ip",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::sonos::discovery::ScanResult;
pub use crate::sonos::soap::SoapResult;

/// Convenient Result alias for application-wide operations.
pub type SubnetResult<T> = Result<T, SubnetError>;

impl From<SoapError> for SubnetError {
    fn from(err: SoapError) -> Self {
        Self::Soap(err.to_string())
    }
}

impl From<ScanError> for SubnetError {
    fn from(err: ScanError) -> Self {
        Self::Scan(err.to_string())
    }
}

impl From<IpValidationError> for SubnetError {
    fn from(err: IpValidationError) -> Self {
        Self::InvalidIp(err.to_string())
    }
}
