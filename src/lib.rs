//! # ble-discovery
//!
//! Timeout-bounded BLE device discovery for gateway connectivity layers.
//! Turns the adapter's stateful scan-and-poll operation into a cancellable,
//! one-shot, observable computation: start a scan, hold it open for a
//! caller-specified window, stop it, then resolve either a single matched
//! device or a full device snapshot. Results are consumed by blocking on the
//! returned future or by registering a one-shot callback.
//!
//! ```no_run
//! use std::time::Duration;
//! use ble_discovery::{BtleplugAdapter, DiscoveryEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rt = tokio::runtime::Runtime::new()?;
//! let adapter = rt.block_on(BtleplugAdapter::first())?;
//! let engine = DiscoveryEngine::new(adapter)?;
//!
//! let devices = engine.enumerate(Duration::from_secs(5)).await_result()?;
//! for device in devices {
//!     println!("{}", device.label());
//! }
//! # Ok(())
//! # }
//! ```

mod adapter;
mod config;
mod device;
mod engine;
mod error;
mod future;
mod request;
mod worker;

pub use adapter::{BtleplugAdapter, ScanAdapter};
pub use config::DiscoveryConfig;
pub use device::DiscoveredDevice;
pub use engine::DiscoveryEngine;
pub use error::{AdapterError, ConfigError, DiscoveryError};
pub use future::{DiscoveryFuture, FutureState};
pub use request::DiscoveryRequest;
pub use worker::DiscoveryOutcome;
