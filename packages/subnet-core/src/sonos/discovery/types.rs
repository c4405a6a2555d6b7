//! Shared types for subnet discovery.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised before any probe is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The subnet string is not `a.b.c.d/prefix`.
    #[error("invalid subnet: {0}")]
    InvalidSubnet(String),

    /// The subnet is wider than the configured limit.
    #[error("subnet /{prefix} is too wide (minimum prefix is /{min})")]
    SubnetTooWide { prefix: u8, min: u8 },

    /// A single address failed validation.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Convenient Result alias for discovery operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// An IPv4 network in CIDR form.
///
/// Host bits in the input are ignored: `192.168.1.77/24` is the same range
/// as `192.168.1.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetRange {
    network: Ipv4Addr,
    prefix: u8,
}

impl SubnetRange {
    /// Parses `a.b.c.d/prefix`.
    ///
    /// Any prefix from /0 to /32 is accepted; see
    /// [`SubnetRange::at_most_as_wide_as`] to cap the range.
    ///
    /// # Errors
    /// [`ScanError::InvalidSubnet`] for malformed input.
    pub fn parse(cidr: &str) -> ScanResult<Self> {
        let invalid = || ScanError::InvalidSubnet(cidr.to_string());

        let (addr, prefix) = cidr.trim().split_once('/').ok_or_else(invalid)?;
        let addr: Ipv4Addr = addr.trim().parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.trim().parse().map_err(|_| invalid())?;

        if prefix > 32 {
            return Err(invalid());
        }

        let mask = Self::mask(prefix);
        Ok(Self {
            network: Ipv4Addr::from(u32::from(addr) & mask),
            prefix,
        })
    }

    /// Rejects ranges with a prefix shorter than `min_prefix`.
    ///
    /// # Errors
    /// [`ScanError::SubnetTooWide`] when `prefix < min_prefix`.
    pub fn at_most_as_wide_as(self, min_prefix: u8) -> ScanResult<Self> {
        if self.prefix < min_prefix {
            return Err(ScanError::SubnetTooWide {
                prefix: self.prefix,
                min: min_prefix,
            });
        }
        Ok(self)
    }

    fn mask(prefix: u8) -> u32 {
        u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0)
    }

    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Usable host addresses, ascending, produced lazily.
    ///
    /// Network and broadcast addresses are excluded, except for /31 and /32
    /// where every address is a host.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let first = u32::from(self.network);
        let last = first | !Self::mask(self.prefix);

        let range = if self.prefix >= 31 {
            first..=last
        } else {
            first + 1..=last - 1
        };
        range.map(Ipv4Addr::from)
    }

    /// Number of addresses [`hosts`](Self::hosts) yields.
    #[must_use]
    pub fn host_count(&self) -> u64 {
        let size = 1u64 << (32 - u32::from(self.prefix));
        if self.prefix >= 31 {
            size
        } else {
            size - 2
        }
    }
}

impl FromStr for SubnetRange {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SubnetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}
