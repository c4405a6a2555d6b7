//! Subnet discovery.
//!
//! Sonos players normally announce themselves over SSDP, but multicast does
//! not cross VLANs. Discovery here is unicast only: every host address of a
//! subnet is probed for a device description.
//!
//! - `types` - Subnet ranges and discovery errors
//! - `scan` - Batched probing and single-address validation

mod scan;
mod types;

pub use scan::{scan_subnet, validate_address};
pub use types::{ScanError, ScanResult, SubnetRange};
