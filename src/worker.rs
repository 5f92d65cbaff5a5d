//! # Discovery Worker
//!
//! The background routine that drives one discovery future to completion:
//! start the scan, sleep in fixed increments until the scan window elapses,
//! stop the scan, then resolve the result. One worker runs per future;
//! workers are never pooled or reused.
//!
//! Scan control failures are logged and swallowed: losing control of the
//! scan does not make the request unresolvable. The stop command is issued
//! on every exit path, including after a failed start and after an
//! interruption.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::adapter::ScanAdapter;
use crate::device::DiscoveredDevice;
use crate::error::{AdapterError, DiscoveryError};
use crate::future::FutureCore;
use crate::request::DiscoveryRequest;

/// Worker timing knobs, taken from the engine's [`DiscoveryConfig`].
///
/// [`DiscoveryConfig`]: crate::config::DiscoveryConfig
#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerConfig {
    /// Fixed sleep increment of the wait loop.
    pub poll_interval: Duration,
    /// Bound on the post-scan single-device lookup.
    pub lookup_timeout: Duration,
}

/// How a discovery value is resolved once the scan window closes, and
/// whether completing with it should fire a registered callback.
#[async_trait]
pub trait DiscoveryOutcome: Clone + Send + Sync + Sized + 'static {
    async fn resolve<A: ScanAdapter>(
        adapter: &A,
        request: &DiscoveryRequest,
        lookup_timeout: Duration,
    ) -> Result<Self, AdapterError>;

    fn notifies(&self) -> bool;
}

/// Single-device lookup: bounded find by name or address. A miss is a
/// successful empty value and does not notify the callback.
#[async_trait]
impl DiscoveryOutcome for Option<DiscoveredDevice> {
    async fn resolve<A: ScanAdapter>(
        adapter: &A,
        request: &DiscoveryRequest,
        lookup_timeout: Duration,
    ) -> Result<Self, AdapterError> {
        adapter
            .find(request.name_filter(), request.address_filter(), lookup_timeout)
            .await
    }

    fn notifies(&self) -> bool {
        self.is_some()
    }
}

/// Full enumeration: the adapter's device snapshot taken after the scan
/// window closed, in adapter order. Always notifies.
#[async_trait]
impl DiscoveryOutcome for Vec<DiscoveredDevice> {
    async fn resolve<A: ScanAdapter>(
        adapter: &A,
        _request: &DiscoveryRequest,
        _lookup_timeout: Duration,
    ) -> Result<Self, AdapterError> {
        adapter.devices().await
    }

    fn notifies(&self) -> bool {
        true
    }
}

/// Fails the future if the worker task is dropped before resolving it, so
/// waiters blocked on the future never strand when the engine's runtime
/// shuts down mid-request. A no-op once the future is terminal.
struct CompletionGuard<T: DiscoveryOutcome> {
    core: Arc<FutureCore<T>>,
}

impl<T: DiscoveryOutcome> Drop for CompletionGuard<T> {
    fn drop(&mut self) {
        if self.core.fail(DiscoveryError::Interrupted) {
            log::warn!("Discovery worker dropped before resolving; failing the future");
        }
    }
}

pub(crate) async fn run<A, T>(
    adapter: Arc<A>,
    request: DiscoveryRequest,
    core: Arc<FutureCore<T>>,
    config: WorkerConfig,
    interrupt: Arc<AtomicBool>,
) where
    A: ScanAdapter,
    T: DiscoveryOutcome,
{
    let _guard = CompletionGuard { core: core.clone() };

    core.mark_scanning();

    match adapter.is_scanning().await {
        Ok(true) => {
            log::warn!("The BLE adapter is already discovering; recording the conflict");
            core.record_conflict(DiscoveryError::AlreadyScanning);
        }
        Ok(false) => {}
        Err(e) => log::warn!("Could not query scan state: {}", e),
    }

    // The scan may already be running from elsewhere, so a start failure is
    // not terminal.
    if let Err(e) = adapter.start_scan().await {
        log::error!("Start discovery failed: {}", e);
    }

    let start = Instant::now();
    let mut interrupted = false;
    while start.elapsed() < request.scan_window() {
        if interrupt.load(Ordering::Relaxed) {
            log::info!("Discovery interrupted after {:?}", start.elapsed());
            interrupted = true;
            break;
        }
        tokio::time::sleep(config.poll_interval).await;
    }

    if let Err(e) = adapter.stop_scan().await {
        log::error!("Stop discovery failed: {}", e);
    }

    if interrupted {
        core.fail(DiscoveryError::Interrupted);
        return;
    }

    match T::resolve(adapter.as_ref(), &request, config.lookup_timeout).await {
        Ok(value) => {
            let notify = value.notifies();
            core.complete(value, notify);
        }
        Err(e) => {
            core.fail(DiscoveryError::Adapter(e));
        }
    }
}
