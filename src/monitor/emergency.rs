//! Resource-threshold emergency stop
//!
//! Polls a resource probe while a run is active and trips the shared cancel
//! flag once a configured limit is exceeded.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CancelHandle, CancellationMonitor};
use crate::config::ResourceLimits;

/// Point-in-time resource usage for the current run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceUsage {
    pub elapsed: Duration,
    pub cost_usd: Option<f64>,
    pub memory_mb: Option<u64>,
}

/// Source of resource usage samples
pub trait ResourceProbe: Send + Sync {
    fn sample(&self, elapsed: Duration) -> ResourceUsage;
}

/// Probe that estimates cost from wall time alone
#[derive(Clone, Debug)]
pub struct EstimatedUsageProbe {
    pub cost_per_hour_usd: f64,
}

impl Default for EstimatedUsageProbe {
    fn default() -> Self {
        Self {
            cost_per_hour_usd: 0.50,
        }
    }
}

impl ResourceProbe for EstimatedUsageProbe {
    fn sample(&self, elapsed: Duration) -> ResourceUsage {
        ResourceUsage {
            elapsed,
            cost_usd: Some(elapsed.as_secs_f64() / 3600.0 * self.cost_per_hour_usd),
            memory_mb: None,
        }
    }
}

/// Cancellation monitor enforcing [`ResourceLimits`]
pub struct EmergencyStop {
    limits: ResourceLimits,
    probe: Arc<dyn ResourceProbe>,
    handle: CancelHandle,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EmergencyStop {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            probe: Arc::new(EstimatedUsageProbe::default()),
            handle: CancelHandle::new(),
            interval: Duration::from_secs(1),
            task: Mutex::new(None),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn ResourceProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Share an externally owned flag, e.g. one tripped by Ctrl-C
    pub fn with_handle(mut self, handle: CancelHandle) -> Self {
        self.handle = handle;
        self
    }

    pub fn handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    /// First limit the sample exceeds, if any
    pub fn check(limits: &ResourceLimits, usage: &ResourceUsage) -> Option<String> {
        if let Some(max) = limits.max_duration_secs {
            if usage.elapsed > Duration::from_secs(max) {
                return Some(format!(
                    "run exceeded {}s duration limit ({:.1}s elapsed)",
                    max,
                    usage.elapsed.as_secs_f64()
                ));
            }
        }
        if let (Some(max), Some(cost)) = (limits.max_cost_usd, usage.cost_usd) {
            if cost > max {
                return Some(format!(
                    "estimated cost ${cost:.2} exceeded ${max:.2} limit"
                ));
            }
        }
        if let (Some(max), Some(memory)) = (limits.max_memory_mb, usage.memory_mb) {
            if memory > max {
                return Some(format!("memory {memory}MB exceeded {max}MB limit"));
            }
        }
        None
    }
}

impl CancellationMonitor for EmergencyStop {
    fn start(&self) {
        let Ok(mut slot) = self.task.lock() else {
            return;
        };
        if slot.is_some() {
            return;
        }
        if self.limits.is_unbounded() {
            debug!("No resource limits configured; emergency stop only watches the cancel flag");
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Emergency stop started outside a tokio runtime; resource polling disabled");
            return;
        };

        let limits = self.limits.clone();
        let probe = Arc::clone(&self.probe);
        let handle = self.handle.clone();
        let interval = self.interval;

        *slot = Some(runtime.spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if handle.is_cancelled() {
                    break;
                }
                let usage = probe.sample(started.elapsed());
                if let Some(reason) = EmergencyStop::check(&limits, &usage) {
                    warn!("Emergency stop: {}", reason);
                    handle.cancel(reason);
                    break;
                }
            }
        }));
    }

    fn stop(&self) {
        if let Ok(mut slot) = self.task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    fn reason(&self) -> Option<String> {
        self.handle.reason()
    }
}

impl Drop for EmergencyStop {
    fn drop(&mut self) {
        self.stop();
    }
}
