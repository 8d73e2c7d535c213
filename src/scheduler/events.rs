//! Progress reporting
//!
//! The scheduler publishes [`ProgressEvent`]s to every registered
//! [`ProgressListener`]. Listeners observe only; they cannot influence a run.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::models::{AbortReason, RunPhase, SuiteStatus};

/// Something that happened during a run
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    RunStarted {
        run_id: String,
        suites: usize,
        parallel: bool,
    },
    PhaseChanged {
        phase: RunPhase,
    },
    BatchStarted {
        index: usize,
        total: usize,
        suites: Vec<String>,
    },
    SuiteStarted {
        suite: String,
    },
    SuiteRetrying {
        suite: String,
        /// Attempt that just failed, starting at 1
        attempt: u32,
    },
    SuiteFinished {
        suite: String,
        status: SuiteStatus,
        score: f64,
        duration_ms: u64,
    },
    SuiteSkipped {
        suite: String,
        reason: String,
    },
    RunAborted {
        reason: AbortReason,
    },
    RunFinished {
        run_id: String,
        overall_success: bool,
        overall_score: f64,
        duration_ms: u64,
    },
}

/// Observer of run progress
pub trait ProgressListener: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Fan-out to registered listeners
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn ProgressListener>>,
}

impl EventBus {
    pub fn subscribe(&mut self, listener: Arc<dyn ProgressListener>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: ProgressEvent) {
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Writes events to the tracing log
#[derive(Clone, Copy, Debug, Default)]
pub struct LogListener;

impl ProgressListener for LogListener {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { run_id, suites, parallel } => {
                debug!("[{}] started: {} suites, parallel={}", run_id, suites, parallel)
            }
            ProgressEvent::PhaseChanged { phase } => debug!("phase -> {}", phase),
            ProgressEvent::BatchStarted { index, total, suites } => {
                debug!("batch {}/{}: {}", index + 1, total, suites.join(", "))
            }
            ProgressEvent::SuiteStarted { suite } => debug!("{} started", suite),
            ProgressEvent::SuiteRetrying { suite, attempt } => {
                debug!("{} failed attempt {}, retrying", suite, attempt)
            }
            ProgressEvent::SuiteFinished {
                suite,
                status,
                score,
                duration_ms,
            } => debug!(
                "{} {} {} score {:.1} in {}ms",
                status.symbol(),
                suite,
                status,
                score,
                duration_ms
            ),
            ProgressEvent::SuiteSkipped { suite, reason } => {
                debug!("{} {} skipped: {}", SuiteStatus::Skipped.symbol(), suite, reason)
            }
            ProgressEvent::RunAborted { reason } => debug!("run aborted: {}", reason),
            ProgressEvent::RunFinished {
                run_id,
                overall_success,
                overall_score,
                duration_ms,
            } => debug!(
                "[{}] finished: success={} score {:.1} in {}ms",
                run_id, overall_success, overall_score, duration_ms
            ),
        }
    }
}

/// Forwards events into an unbounded channel
#[derive(Clone, Debug)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressListener for ChannelListener {
    fn on_event(&self, event: &ProgressEvent) {
        // A dropped receiver just stops observing
        let _ = self.tx.send(event.clone());
    }
}
