//! # Adapter Seam
//!
//! `ScanAdapter` abstracts the native BLE adapter handle consumed by the
//! discovery worker: scan control, a bounded single-device lookup, and a
//! device snapshot. The production implementation wraps btleplug; tests use
//! a mock with call counters.
//!
//! btleplug does not report whether a scan is active, so `BtleplugAdapter`
//! tracks its own scanning flag around `start_scan`/`stop_scan`. Two handles
//! on the same physical adapter therefore won't see each other's scans; the
//! already-scanning check is advisory either way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};

use crate::device::DiscoveredDevice;
use crate::error::AdapterError;

/// Poll interval for the bounded post-scan lookup.
const FIND_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[async_trait]
pub trait ScanAdapter: Send + Sync + 'static {
    async fn start_scan(&self) -> Result<(), AdapterError>;

    async fn stop_scan(&self) -> Result<(), AdapterError>;

    async fn is_scanning(&self) -> Result<bool, AdapterError>;

    /// Bounded lookup of a single device by advertised name and/or address.
    /// Returns `None` when no match appears within `timeout`; an absent
    /// device is not an error.
    async fn find(
        &self,
        name: Option<&str>,
        address: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<DiscoveredDevice>, AdapterError>;

    /// Snapshot of every device the adapter currently knows about, in the
    /// adapter's own order.
    async fn devices(&self) -> Result<Vec<DiscoveredDevice>, AdapterError>;

    /// Human-readable identity of the underlying adapter.
    async fn info(&self) -> Result<String, AdapterError>;
}

/// Production adapter backed by btleplug.
pub struct BtleplugAdapter {
    adapter: Adapter,
    scanning: AtomicBool,
}

impl BtleplugAdapter {
    /// Opens the first Bluetooth adapter on the host.
    pub async fn first() -> Result<Self, AdapterError> {
        let manager = Manager::new()
            .await
            .map_err(|e| AdapterError::ManagerInit(e.to_string()))?;

        let adapters = manager.adapters().await?;

        let adapter = adapters.into_iter().next().ok_or(AdapterError::NoAdapter)?;

        Ok(Self {
            adapter,
            scanning: AtomicBool::new(false),
        })
    }

    async fn snapshot(&self) -> Result<Vec<DiscoveredDevice>, AdapterError> {
        let peripherals = self.adapter.peripherals().await?;

        let mut devices = Vec::with_capacity(peripherals.len());
        for peripheral in peripherals {
            let address = peripheral.address().to_string();
            match peripheral.properties().await {
                Ok(Some(props)) => {
                    devices.push(DiscoveredDevice::new(address, props.local_name, props.rssi));
                }
                Ok(None) => devices.push(DiscoveredDevice::new(address, None, None)),
                Err(e) => {
                    log::debug!("Skipping peripheral {}: properties unavailable ({})", address, e);
                }
            }
        }

        Ok(devices)
    }
}

fn matches(device: &DiscoveredDevice, name: Option<&str>, address: Option<&str>) -> bool {
    if let Some(wanted) = address {
        if device.address.eq_ignore_ascii_case(wanted) {
            return true;
        }
    }
    if let Some(wanted) = name {
        if device.name.as_deref() == Some(wanted) {
            return true;
        }
    }
    false
}

#[async_trait]
impl ScanAdapter for BtleplugAdapter {
    async fn start_scan(&self) -> Result<(), AdapterError> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| AdapterError::Command {
                op: "start_scan",
                reason: e.to_string(),
            })?;
        self.scanning.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), AdapterError> {
        self.adapter.stop_scan().await.map_err(|e| AdapterError::Command {
            op: "stop_scan",
            reason: e.to_string(),
        })?;
        self.scanning.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_scanning(&self) -> Result<bool, AdapterError> {
        Ok(self.scanning.load(Ordering::SeqCst))
    }

    async fn find(
        &self,
        name: Option<&str>,
        address: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<DiscoveredDevice>, AdapterError> {
        let deadline = Instant::now() + timeout;
        loop {
            for device in self.snapshot().await? {
                if matches(&device, name, address) {
                    return Ok(Some(device));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(FIND_POLL_INTERVAL.min(timeout)).await;
        }
    }

    async fn devices(&self) -> Result<Vec<DiscoveredDevice>, AdapterError> {
        self.snapshot().await
    }

    async fn info(&self) -> Result<String, AdapterError> {
        Ok(self.adapter.adapter_info().await?)
    }
}
