//! # Discovery Future
//!
//! A one-shot result holder with blocking wait, optional callback, and
//! cancellation. Each future is driven by exactly one background worker; the
//! worker is the only writer of the state after creation, and the first
//! terminal transition (Completed, Failed, Cancelled) wins — later writes
//! are rejected.
//!
//! ## Callback Contract
//! A registered callback fires at most once, and only on Completed. For
//! single-device lookups it additionally fires only when a device was
//! actually found, so callback-based callers have no failure channel at all.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::{AdapterError, DiscoveryError};
use crate::request::DiscoveryRequest;

type Callback<T> = Box<dyn FnOnce(T) + Send + 'static>;
type StopFn = Arc<dyn Fn() -> Result<(), AdapterError> + Send + Sync>;

/// Lifecycle of a discovery future. Pending is instantaneous: the worker is
/// spawned as part of construction and marks Scanning on its first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureState {
    Pending,
    Scanning,
    Completed,
    Failed,
    Cancelled,
}

impl FutureState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FutureState::Completed | FutureState::Failed | FutureState::Cancelled)
    }
}

enum Slot<T> {
    Pending,
    Scanning,
    Completed(T),
    Failed(DiscoveryError),
    Cancelled,
}

impl<T> Slot<T> {
    fn state(&self) -> FutureState {
        match self {
            Slot::Pending => FutureState::Pending,
            Slot::Scanning => FutureState::Scanning,
            Slot::Completed(_) => FutureState::Completed,
            Slot::Failed(_) => FutureState::Failed,
            Slot::Cancelled => FutureState::Cancelled,
        }
    }
}

struct Inner<T> {
    slot: Slot<T>,
    callback: Option<Callback<T>>,
    // Set when completion should fire the callback (lookup miss does not).
    notify_on_complete: bool,
    // Advisory already-scanning conflict, recorded without terminating.
    conflict: Option<DiscoveryError>,
}

/// Shared between the future handle and its worker.
pub(crate) struct FutureCore<T> {
    inner: Mutex<Inner<T>>,
    cond: Condvar,
}

impl<T: Clone + Send + 'static> FutureCore<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                slot: Slot::Pending,
                callback: None,
                notify_on_complete: false,
                conflict: None,
            }),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn mark_scanning(&self) {
        let mut inner = self.inner.lock().unwrap();
        if matches!(inner.slot, Slot::Pending) {
            inner.slot = Slot::Scanning;
        }
    }

    pub(crate) fn record_conflict(&self, err: DiscoveryError) {
        let mut inner = self.inner.lock().unwrap();
        if inner.conflict.is_none() {
            inner.conflict = Some(err);
        }
    }

    /// First terminal write wins; `notify` gates the callback.
    pub(crate) fn complete(&self, value: T, notify: bool) -> bool {
        let callback = {
            let mut inner = self.inner.lock().unwrap();
            if inner.slot.state().is_terminal() {
                return false;
            }
            inner.slot = Slot::Completed(value.clone());
            inner.notify_on_complete = notify;
            self.cond.notify_all();
            if notify {
                inner.callback.take()
            } else {
                None
            }
        };
        // Invoked outside the lock so the callback may inspect the future.
        if let Some(cb) = callback {
            cb(value);
        }
        true
    }

    pub(crate) fn fail(&self, err: DiscoveryError) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.slot.state().is_terminal() {
            return false;
        }
        inner.slot = Slot::Failed(err);
        inner.callback = None;
        self.cond.notify_all();
        true
    }

    fn cancel(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.slot.state().is_terminal() {
            return false;
        }
        inner.slot = Slot::Cancelled;
        inner.callback = None;
        self.cond.notify_all();
        true
    }

    fn wait(&self) -> Result<T, DiscoveryError> {
        let mut inner = self.inner.lock().unwrap();
        while !inner.slot.state().is_terminal() {
            inner = self.cond.wait(inner).unwrap();
        }
        match &inner.slot {
            Slot::Completed(value) => Ok(value.clone()),
            Slot::Failed(err) => Err(err.clone()),
            Slot::Cancelled => Err(DiscoveryError::Cancelled),
            Slot::Pending | Slot::Scanning => unreachable!("woke on non-terminal state"),
        }
    }

    fn set_callback(&self, callback: Callback<T>) {
        let mut inner = self.inner.lock().unwrap();
        match inner.slot.state() {
            FutureState::Pending | FutureState::Scanning => {
                inner.callback = Some(callback);
            }
            FutureState::Completed if inner.notify_on_complete => {
                let value = match &inner.slot {
                    Slot::Completed(value) => value.clone(),
                    _ => unreachable!(),
                };
                drop(inner);
                callback(value);
            }
            // Failed, Cancelled, or a completion that does not notify.
            _ => {}
        }
    }

    fn state(&self) -> FutureState {
        self.inner.lock().unwrap().slot.state()
    }

    fn conflict(&self) -> Option<DiscoveryError> {
        self.inner.lock().unwrap().conflict.clone()
    }
}

/// Handle to one in-flight discovery attempt.
///
/// Construction (via the engine) already spawned the worker; there is no
/// separate start call.
pub struct DiscoveryFuture<T> {
    core: Arc<FutureCore<T>>,
    request: DiscoveryRequest,
    stop: StopFn,
}

impl<T: Clone + Send + 'static> DiscoveryFuture<T> {
    pub(crate) fn new(core: Arc<FutureCore<T>>, request: DiscoveryRequest, stop: StopFn) -> Self {
        Self { core, request, stop }
    }

    /// The immutable parameters this future was created with.
    pub fn request(&self) -> &DiscoveryRequest {
        &self.request
    }

    /// Blocks the calling thread until the worker reaches a terminal state.
    pub fn await_result(&self) -> Result<T, DiscoveryError> {
        self.core.wait()
    }

    /// Accepted for interface compatibility only: the bound is ignored and
    /// the call waits for the request's own scan window to elapse, since the
    /// discovery duration is already caller-specified in the request.
    pub fn await_timeout(&self, _bound: Duration) -> Result<T, DiscoveryError> {
        log::warn!("The timeout value provided to await_timeout will be ignored");
        self.core.wait()
    }

    /// Attempts to stop the adapter's active scan. Returns true only when the
    /// stop command succeeded and the future was not yet terminal; on a stop
    /// refusal the future stays live and later resolves on its own. An
    /// already-terminal future reports failure without issuing the stop
    /// command.
    pub fn cancel(&self) -> bool {
        if self.core.state().is_terminal() {
            return false;
        }
        if let Err(e) = (self.stop)() {
            log::error!("Stop discovery failed: {}", e);
            return false;
        }
        self.core.cancel()
    }

    /// Registers a one-shot observer. If the future already completed with a
    /// notifying value, the callback is invoked synchronously here; after a
    /// Failed or Cancelled terminal state it is never invoked.
    pub fn set_callback(&self, callback: impl FnOnce(T) + Send + 'static) {
        self.core.set_callback(Box::new(callback));
    }

    pub fn state(&self) -> FutureState {
        self.core.state()
    }

    pub fn is_terminal(&self) -> bool {
        self.core.state().is_terminal()
    }

    /// The advisory already-scanning conflict recorded by the worker, if any.
    /// A conflict does not prevent the future from resolving normally.
    pub fn conflict(&self) -> Option<DiscoveryError> {
        self.core.conflict()
    }
}
