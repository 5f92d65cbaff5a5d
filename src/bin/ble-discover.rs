//! Command-line discovery pass: scans for the given number of seconds and
//! prints every device the adapter saw, or looks up one device when an
//! address is supplied.
//!
//! Usage: `ble-discover [scan-seconds] [address]`

use std::time::Duration;

use ble_discovery::{BtleplugAdapter, DiscoveryConfig, DiscoveryEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let scan_window = Duration::from_secs(
        args.next().map(|s| s.parse()).transpose()?.unwrap_or(5),
    );
    let address = args.next();

    let config = DiscoveryConfig::load().unwrap_or_else(|e| {
        log::warn!("Falling back to default configuration: {}", e);
        DiscoveryConfig::default()
    });

    let rt = tokio::runtime::Runtime::new()?;
    let adapter = rt.block_on(BtleplugAdapter::first())?;
    let engine = DiscoveryEngine::with_config(adapter, config)?;

    log::info!("Using adapter: {}", engine.adapter_info()?);

    match address {
        Some(address) => {
            log::info!("Looking for {} ({:?} scan window)...", address, scan_window);
            match engine.find_by_address(scan_window, &address).await_result()? {
                Some(device) => println!("{}  {}", device.address, device.label()),
                None => println!("No device at {} within the scan window", address),
            }
        }
        None => {
            log::info!("Enumerating devices ({:?} scan window)...", scan_window);
            let devices = engine.enumerate(scan_window).await_result()?;
            if devices.is_empty() {
                println!("No devices found");
            }
            for device in devices {
                println!(
                    "{}  {}  rssi {}",
                    device.address,
                    device.label(),
                    device.rssi.map(|r| r.to_string()).unwrap_or_else(|| "?".to_string())
                );
            }
        }
    }

    engine.shutdown();
    Ok(())
}
