//! # Discovery Engine
//!
//! The facade over the discovery machinery: builds a request, spawns its
//! worker on a dedicated Tokio runtime, and hands back a blocking
//! `DiscoveryFuture` (or registers a callback and forgets the future).
//!
//! Runs its own runtime rather than borrowing the caller's, so blocking
//! callers never need an async context. Each request gets its own worker
//! task; the adapter's own already-scanning signal is the only serialization
//! point between overlapping requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;

use crate::adapter::ScanAdapter;
use crate::config::DiscoveryConfig;
use crate::device::DiscoveredDevice;
use crate::error::{AdapterError, DiscoveryError};
use crate::future::{DiscoveryFuture, FutureCore};
use crate::request::DiscoveryRequest;
use crate::worker::{self, DiscoveryOutcome, WorkerConfig};

pub struct DiscoveryEngine<A: ScanAdapter> {
    adapter: Arc<A>,
    runtime: Runtime,
    config: DiscoveryConfig,
    interrupt: Arc<AtomicBool>,
}

impl<A: ScanAdapter> DiscoveryEngine<A> {
    pub fn new(adapter: A) -> Result<Self, DiscoveryError> {
        Self::with_config(adapter, DiscoveryConfig::default())
    }

    pub fn with_config(adapter: A, config: DiscoveryConfig) -> Result<Self, DiscoveryError> {
        let runtime = Runtime::new().map_err(|e| DiscoveryError::Runtime(e.to_string()))?;
        Ok(Self {
            adapter: Arc::new(adapter),
            runtime,
            config,
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Single-device lookup by address. The scan stays active for
    /// `scan_window`, after which the adapter is asked for the matching
    /// device; no match resolves to `None`.
    pub fn find_by_address(
        &self,
        scan_window: Duration,
        address: impl Into<String>,
    ) -> DiscoveryFuture<Option<DiscoveredDevice>> {
        self.spawn(DiscoveryRequest::by_address(scan_window, address))
    }

    /// Single-device lookup by advertised name.
    pub fn find_by_name(
        &self,
        scan_window: Duration,
        name: impl Into<String>,
    ) -> DiscoveryFuture<Option<DiscoveredDevice>> {
        self.spawn(DiscoveryRequest::by_name(scan_window, name))
    }

    /// Fire-and-forget lookup by address; `on_found` runs only when a device
    /// was actually found. There is no failure channel on this path.
    pub fn find_by_address_with(
        &self,
        scan_window: Duration,
        address: impl Into<String>,
        on_found: impl FnOnce(DiscoveredDevice) + Send + 'static,
    ) {
        let future = self.find_by_address(scan_window, address);
        future.set_callback(move |found| {
            if let Some(device) = found {
                on_found(device);
            }
        });
    }

    /// Fire-and-forget lookup by advertised name.
    pub fn find_by_name_with(
        &self,
        scan_window: Duration,
        name: impl Into<String>,
        on_found: impl FnOnce(DiscoveredDevice) + Send + 'static,
    ) {
        let future = self.find_by_name(scan_window, name);
        future.set_callback(move |found| {
            if let Some(device) = found {
                on_found(device);
            }
        });
    }

    /// Full enumeration: every device the adapter knows about once the scan
    /// window closes, in adapter order.
    pub fn enumerate(&self, scan_window: Duration) -> DiscoveryFuture<Vec<DiscoveredDevice>> {
        self.spawn(DiscoveryRequest::enumerate(scan_window))
    }

    /// Fire-and-forget enumeration.
    pub fn enumerate_with(
        &self,
        scan_window: Duration,
        on_found: impl FnOnce(Vec<DiscoveredDevice>) + Send + 'static,
    ) {
        let future = self.enumerate(scan_window);
        future.set_callback(on_found);
    }

    /// Stops the adapter's active scan directly, outside any future's
    /// lifecycle. Futures currently scanning are left to resolve on their
    /// own.
    pub fn stop_discovery(&self) -> Result<(), DiscoveryError> {
        self.runtime
            .block_on(self.adapter.stop_scan())
            .map_err(DiscoveryError::Stop)
    }

    /// Identity of the underlying adapter.
    pub fn adapter_info(&self) -> Result<String, AdapterError> {
        self.runtime.block_on(self.adapter.info())
    }

    /// Interrupts every in-flight worker: each fails with `Interrupted` at
    /// its next wait-loop tick, after stopping the scan.
    pub fn shutdown(&self) {
        log::info!("Discovery engine shutting down");
        self.interrupt.store(true, Ordering::Relaxed);
    }

    fn spawn<T: DiscoveryOutcome>(&self, request: DiscoveryRequest) -> DiscoveryFuture<T> {
        log::debug!(
            "Starting {}: window {:?}, name {:?}, address {:?}",
            if request.is_lookup() { "lookup" } else { "enumeration" },
            request.scan_window(),
            request.name_filter(),
            request.address_filter()
        );

        let core = Arc::new(FutureCore::new());
        self.runtime.spawn(worker::run(
            self.adapter.clone(),
            request.clone(),
            core.clone(),
            self.worker_config(),
            self.interrupt.clone(),
        ));

        let adapter = self.adapter.clone();
        let handle = self.runtime.handle().clone();
        DiscoveryFuture::new(
            core,
            request,
            Arc::new(move || handle.block_on(adapter.stop_scan())),
        )
    }

    fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            poll_interval: self.config.poll_interval(),
            lookup_timeout: self.config.lookup_timeout(),
        }
    }
}

impl<A: ScanAdapter> Drop for DiscoveryEngine<A> {
    fn drop(&mut self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockAdapter;
    use crate::future::FutureState;
    use std::sync::mpsc;
    use std::time::Instant;

    fn fast_engine(adapter: MockAdapter) -> DiscoveryEngine<MockAdapter> {
        let config = DiscoveryConfig {
            poll_interval_ms: 10,
            lookup_timeout_secs: 1,
        };
        DiscoveryEngine::with_config(adapter, config).unwrap()
    }

    #[test]
    fn test_lookup_miss_waits_full_window_and_stops_once() {
        let engine = fast_engine(MockAdapter::new());
        let window = Duration::from_millis(100);

        let started = Instant::now();
        let future = engine.find_by_address(window, "AA:BB:CC:DD:EE:FF");
        let found = future.await_result().unwrap();
        assert!(started.elapsed() >= window);
        assert_eq!(found, None);
        assert_eq!(engine.adapter.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_await_timeout_bound_is_ignored() {
        let engine = fast_engine(MockAdapter::new());
        let window = Duration::from_millis(100);

        let started = Instant::now();
        let future = engine.find_by_name(window, "Thermo");
        let found = future.await_timeout(Duration::from_millis(1)).unwrap();
        assert!(started.elapsed() >= window);
        assert_eq!(found, None);
    }

    #[test]
    fn test_find_by_name_resolves_matching_device() {
        let adapter = MockAdapter::new();
        adapter.set_devices(vec![
            MockAdapter::device("11:22:33:44:55:66", "Other"),
            MockAdapter::device("AA:BB:CC:DD:EE:FF", "Thermo"),
        ]);
        let engine = fast_engine(adapter);

        let future = engine.find_by_name(Duration::from_millis(50), "Thermo");
        let found = future.await_result().unwrap().unwrap();
        assert_eq!(found.address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(future.state(), FutureState::Completed);
    }

    #[test]
    fn test_enumerate_returns_snapshot_in_adapter_order() {
        let adapter = MockAdapter::new();
        adapter.set_devices(vec![
            MockAdapter::device("11:22:33:44:55:66", "First"),
            MockAdapter::device("AA:BB:CC:DD:EE:FF", "Second"),
        ]);
        let engine = fast_engine(adapter);

        let devices = engine.enumerate(Duration::from_millis(50)).await_result().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].label(), "First");
        assert_eq!(devices[1].label(), "Second");
    }

    #[test]
    fn test_enumerate_with_fires_callback() {
        let adapter = MockAdapter::new();
        adapter.set_devices(vec![MockAdapter::device("AA:BB:CC:DD:EE:FF", "Thermo")]);
        let engine = fast_engine(adapter);

        let (tx, rx) = mpsc::channel();
        engine.enumerate_with(Duration::from_millis(50), move |devices| {
            tx.send(devices).unwrap();
        });

        let devices = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn test_find_with_callback_silent_on_miss() {
        let engine = fast_engine(MockAdapter::new());

        let (tx, rx) = mpsc::channel::<DiscoveredDevice>();
        engine.find_by_address_with(Duration::from_millis(50), "AA:BB:CC:DD:EE:FF", move |d| {
            tx.send(d).unwrap();
        });

        // The worker needs the window plus resolution; leave a wide margin.
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
    }

    #[test]
    fn test_find_with_callback_fires_on_match() {
        let adapter = MockAdapter::new();
        adapter.set_devices(vec![MockAdapter::device("AA:BB:CC:DD:EE:FF", "Thermo")]);
        let engine = fast_engine(adapter);

        let (tx, rx) = mpsc::channel();
        engine.find_by_address_with(Duration::from_millis(50), "aa:bb:cc:dd:ee:ff", move |d| {
            tx.send(d).unwrap();
        });

        let device = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(device.name.as_deref(), Some("Thermo"));
    }

    #[test]
    fn test_stop_discovery_surfaces_adapter_refusal() {
        let adapter = MockAdapter::new();
        adapter.fail_stop.store(true, Ordering::SeqCst);
        let engine = fast_engine(adapter);

        assert!(matches!(
            engine.stop_discovery(),
            Err(DiscoveryError::Stop(AdapterError::Command { op: "stop_scan", .. }))
        ));
    }

    #[test]
    fn test_cancel_refusal_leaves_future_to_resolve() {
        let adapter = MockAdapter::new();
        adapter.fail_stop.store(true, Ordering::SeqCst);
        adapter.set_devices(vec![MockAdapter::device("AA:BB:CC:DD:EE:FF", "Thermo")]);
        let engine = fast_engine(adapter);

        let future = engine.find_by_name(Duration::from_millis(100), "Thermo");
        assert!(!future.cancel());
        assert!(!future.state().is_terminal());

        // Worker-side stop refusal is swallowed; the lookup still resolves.
        let found = future.await_result().unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_cancel_success_transitions_to_cancelled() {
        let engine = fast_engine(MockAdapter::new());

        let future = engine.find_by_name(Duration::from_secs(30), "Thermo");
        assert!(future.cancel());
        assert!(matches!(future.await_result(), Err(DiscoveryError::Cancelled)));

        engine.shutdown();
    }

    #[test]
    fn test_second_request_records_conflict_yet_resolves() {
        let adapter = MockAdapter::new();
        adapter.set_devices(vec![MockAdapter::device("AA:BB:CC:DD:EE:FF", "Thermo")]);
        let engine = fast_engine(adapter);

        let first = engine.enumerate(Duration::from_millis(300));
        // Give the first worker time to start its scan.
        std::thread::sleep(Duration::from_millis(100));

        let second = engine.find_by_name(Duration::from_millis(50), "Thermo");
        let found = second.await_result().unwrap();
        assert!(matches!(second.conflict(), Some(DiscoveryError::AlreadyScanning)));
        assert!(found.is_some());

        assert!(first.await_result().is_ok());
    }

    #[test]
    fn test_shutdown_interrupts_in_flight_workers() {
        let engine = fast_engine(MockAdapter::new());

        let future = engine.enumerate(Duration::from_secs(30));
        std::thread::sleep(Duration::from_millis(50));
        engine.shutdown();

        assert!(matches!(future.await_result(), Err(DiscoveryError::Interrupted)));
        assert_eq!(engine.adapter.stop_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_engine_drop_fails_in_flight_futures() {
        let engine = fast_engine(MockAdapter::new());
        let future = engine.enumerate(Duration::from_secs(30));
        std::thread::sleep(Duration::from_millis(50));

        let (tx, rx) = mpsc::channel();
        let waiter = std::thread::spawn(move || {
            tx.send(future.await_result()).unwrap();
            future
        });

        drop(engine);

        // The waiter must observe a terminal state, not hang on the Condvar.
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(DiscoveryError::Interrupted)));

        // Cancel after the engine is gone reports failure without touching
        // the defunct runtime.
        let future = waiter.join().unwrap();
        assert!(!future.cancel());
    }

    #[test]
    fn test_callback_variant_not_lost_on_engine_drop() {
        let adapter = MockAdapter::new();
        adapter.set_devices(vec![MockAdapter::device("AA:BB:CC:DD:EE:FF", "Thermo")]);
        let engine = fast_engine(adapter);

        let (tx, rx) = mpsc::channel::<DiscoveredDevice>();
        engine.find_by_address_with(Duration::from_secs(30), "AA:BB:CC:DD:EE:FF", move |d| {
            let _ = tx.send(d);
        });
        std::thread::sleep(Duration::from_millis(50));
        drop(engine);

        // Interruption fails the future, so the success callback stays
        // silent and its channel closes rather than hanging the receiver.
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn test_adapter_info_passthrough() {
        let engine = fast_engine(MockAdapter::new());
        assert_eq!(engine.adapter_info().unwrap(), "mock adapter");
    }
}
