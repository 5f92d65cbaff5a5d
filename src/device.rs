//! # Discovered Device
//!
//! Immutable identity record for one peripheral as reported by the adapter.
//! The engine never mutates devices; each snapshot or lookup hands back
//! fresh records.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub address: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

impl DiscoveredDevice {
    pub fn new(address: String, name: Option<String>, rssi: Option<i16>) -> Self {
        Self { address, name, rssi }
    }

    /// Display label: the advertised name when present, the address otherwise.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}
