//! # Error Types Module
//!
//! Centralized error handling for the discovery engine.
//! Provides custom error types for each layer with proper context and error chaining.
//!
//! ## Error Types
//! - `AdapterError`: failures reported by the underlying BLE adapter
//! - `DiscoveryError`: terminal failures of a discovery future
//! - `ConfigError`: configuration file I/O and parsing errors
//!
//! ## Propagation Policy
//! Adapter command failures (`start_scan`/`stop_scan`) are logged by the
//! worker and swallowed; the request is still resolved best-effort. Only
//! interruption and cancellation terminate a future as a failure. Callers
//! observe failures solely through `DiscoveryFuture::await_result`.

use std::fmt;

/// Errors reported by the underlying BLE adapter.
#[derive(Debug, Clone)]
pub enum AdapterError {
    /// Bluetooth manager initialization failed
    ManagerInit(String),
    /// No Bluetooth adapter found on the host
    NoAdapter,
    /// A scan control command failed on the adapter
    Command { op: &'static str, reason: String },
    /// Any other backend failure
    Backend(String),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::ManagerInit(msg) => {
                write!(f, "Failed to initialize Bluetooth manager: {}", msg)
            }
            AdapterError::NoAdapter => {
                write!(f, "No Bluetooth adapter found. Please ensure Bluetooth is enabled.")
            }
            AdapterError::Command { op, reason } => {
                write!(f, "Adapter command '{}' failed: {}", op, reason)
            }
            AdapterError::Backend(msg) => {
                write!(f, "Bluetooth backend error: {}", msg)
            }
        }
    }
}

impl std::error::Error for AdapterError {}

impl From<btleplug::Error> for AdapterError {
    fn from(e: btleplug::Error) -> Self {
        AdapterError::Backend(e.to_string())
    }
}

/// Terminal failures of a discovery future.
#[derive(Debug, Clone)]
pub enum DiscoveryError {
    /// The adapter reported an active scan when the request started
    AlreadyScanning,
    /// The worker's wait loop was interrupted before the scan window elapsed
    Interrupted,
    /// The future was cancelled before it could resolve
    Cancelled,
    /// Failed to create the background Tokio runtime
    Runtime(String),
    /// A stop-discovery request failed on the adapter
    Stop(AdapterError),
    /// Result resolution failed on the adapter
    Adapter(AdapterError),
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::AlreadyScanning => {
                write!(f, "The BLE adapter is already discovering")
            }
            DiscoveryError::Interrupted => {
                write!(f, "Discovery was interrupted before the scan window elapsed")
            }
            DiscoveryError::Cancelled => {
                write!(f, "Discovery was cancelled")
            }
            DiscoveryError::Runtime(msg) => {
                write!(f, "Failed to create async runtime: {}", msg)
            }
            DiscoveryError::Stop(e) => {
                write!(f, "Stop discovery failed: {}", e)
            }
            DiscoveryError::Adapter(e) => {
                write!(f, "Discovery failed on the adapter: {}", e)
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoveryError::Stop(e) | DiscoveryError::Adapter(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
        }
    }
}
