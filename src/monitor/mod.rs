//! Cancellation monitoring
//!
//! The scheduler polls a [`CancellationMonitor`] between units of work. The
//! monitor is started before execution and stopped on every exit path through
//! [`MonitorGuard`].

mod emergency;

pub use emergency::{EmergencyStop, EstimatedUsageProbe, ResourceProbe, ResourceUsage};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Watchdog that can request early termination
pub trait CancellationMonitor: Send + Sync {
    fn start(&self);
    fn stop(&self);
    fn is_cancelled(&self) -> bool;

    /// Human-readable cause once cancelled
    fn reason(&self) -> Option<String> {
        None
    }
}

/// Monitor that never cancels
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverCancel;

impl CancellationMonitor for NeverCancel {
    fn start(&self) {}
    fn stop(&self) {}
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared cancellation flag
///
/// Clones observe the same flag; the first reason given wins.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    reason: Arc<Mutex<Option<String>>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, reason: impl Into<String>) {
        if let Ok(mut slot) = self.reason.lock() {
            if slot.is_none() {
                *slot = Some(reason.into());
            }
        }
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.lock().ok().and_then(|r| r.clone())
    }
}

impl CancellationMonitor for CancelHandle {
    fn start(&self) {}
    fn stop(&self) {}

    fn is_cancelled(&self) -> bool {
        CancelHandle::is_cancelled(self)
    }

    fn reason(&self) -> Option<String> {
        CancelHandle::reason(self)
    }
}

/// Starts a monitor on creation and stops it on drop
pub struct MonitorGuard {
    monitor: Arc<dyn CancellationMonitor>,
}

impl MonitorGuard {
    pub fn start(monitor: Arc<dyn CancellationMonitor>) -> Self {
        debug!("Starting cancellation monitor");
        monitor.start();
        Self { monitor }
    }

    pub fn is_cancelled(&self) -> bool {
        self.monitor.is_cancelled()
    }

    pub fn reason(&self) -> String {
        self.monitor
            .reason()
            .unwrap_or_else(|| "cancellation requested".to_string())
    }
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        debug!("Stopping cancellation monitor");
        self.monitor.stop();
    }
}
