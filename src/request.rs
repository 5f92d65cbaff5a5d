//! # Discovery Request
//!
//! Immutable parameters of one discovery attempt: how long the scan stays
//! active, and an optional name or address filter selecting a single device.
//! A request with no filter enumerates every device the adapter knows about
//! once the scan window closes.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    scan_window: Duration,
    name_filter: Option<String>,
    address_filter: Option<String>,
}

impl DiscoveryRequest {
    /// Single-device lookup by advertised name.
    pub fn by_name(scan_window: Duration, name: impl Into<String>) -> Self {
        Self {
            scan_window,
            name_filter: Some(name.into()),
            address_filter: None,
        }
    }

    /// Single-device lookup by address.
    pub fn by_address(scan_window: Duration, address: impl Into<String>) -> Self {
        Self {
            scan_window,
            name_filter: None,
            address_filter: Some(address.into()),
        }
    }

    /// Full enumeration: no filter, snapshot of all devices after the window.
    pub fn enumerate(scan_window: Duration) -> Self {
        Self {
            scan_window,
            name_filter: None,
            address_filter: None,
        }
    }

    pub fn scan_window(&self) -> Duration {
        self.scan_window
    }

    pub fn name_filter(&self) -> Option<&str> {
        self.name_filter.as_deref()
    }

    pub fn address_filter(&self) -> Option<&str> {
        self.address_filter.as_deref()
    }

    /// True when the request selects a single device rather than a snapshot.
    pub fn is_lookup(&self) -> bool {
        self.name_filter.is_some() || self.address_filter.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_shapes() {
        let req = DiscoveryRequest::by_name(Duration::from_secs(2), "Thermo");
        assert!(req.is_lookup());
        assert_eq!(req.name_filter(), Some("Thermo"));
        assert_eq!(req.address_filter(), None);

        let req = DiscoveryRequest::by_address(Duration::from_secs(2), "AA:BB:CC:DD:EE:FF");
        assert!(req.is_lookup());
        assert_eq!(req.address_filter(), Some("AA:BB:CC:DD:EE:FF"));

        let req = DiscoveryRequest::enumerate(Duration::from_secs(1));
        assert!(!req.is_lookup());
        assert_eq!(req.scan_window(), Duration::from_secs(1));
    }
}
