//! Single-suite execution
//!
//! Every suite runs in its own tokio task so a panicking executor surfaces as a
//! `JoinError` instead of tearing down the run. Dropping a [`SuiteTask`]
//! before it is joined aborts the task, so a run future dropped by a caller's
//! timeout leaves no suites behind.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, warn};

use super::events::{EventBus, ProgressEvent};
use super::RunContext;
use crate::error::{ConfigurationError, SuiteExecutionError};
use crate::executor::SuiteExecutor;
use crate::models::{SuiteConfig, SuiteOutcome, DETAIL_ATTEMPTS};
use crate::utils::Timer;

/// A launched suite; aborted if dropped before completion
pub(crate) struct SuiteTask {
    name: String,
    domain: String,
    handle: JoinHandle<SuiteOutcome>,
}

/// Joined suite outcome plus any run-level error it produced
pub(crate) struct Settled {
    pub outcome: SuiteOutcome,
    pub run_error: Option<String>,
}

impl SuiteTask {
    pub fn spawn(ctx: &RunContext<'_>, name: &str) -> Self {
        let Some(spec) = ctx.planner.suite(name) else {
            return Self::ready(name, name, format!("Unknown suite '{name}'"));
        };
        let Some(executor) = ctx.registry.resolve(name) else {
            let err = ConfigurationError::MissingExecutor(name.to_string());
            return Self::ready(name, &spec.domain(), err.to_string());
        };

        let handle = tokio::spawn(attempt_suite(
            name.to_string(),
            spec.configuration.clone(),
            executor,
            ctx.config.retry_attempts,
            ctx.semaphore.clone(),
            ctx.events.clone(),
        ));

        Self {
            name: name.to_string(),
            domain: spec.domain(),
            handle,
        }
    }

    /// Task that immediately yields a failure
    fn ready(name: &str, domain: &str, error: String) -> Self {
        let outcome = SuiteOutcome::from_error(name, error);
        Self {
            name: name.to_string(),
            domain: domain.to_string(),
            handle: tokio::spawn(async move { outcome }),
        }
    }

    pub async fn join(mut self) -> Settled {
        let name = std::mem::take(&mut self.name);
        let domain = std::mem::take(&mut self.domain);
        let (mut outcome, run_error) = match (&mut self.handle).await {
            Ok(outcome) => (outcome, None),
            Err(join_error) => {
                let err = SuiteExecutionError::Panicked(panic_message(join_error));
                error!("Suite '{}' task failed: {}", name, err);
                let message = err.to_string();
                (
                    SuiteOutcome::from_error(&name, message.clone()),
                    Some(format!("Suite '{}': {}", name, message)),
                )
            }
        };

        outcome.suite_name = name;
        outcome.domain = domain;
        outcome.normalize();
        Settled { outcome, run_error }
    }
}

impl Drop for SuiteTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run a suite, retrying failures up to `retry_attempts` extra times
async fn attempt_suite(
    name: String,
    config: SuiteConfig,
    executor: Arc<dyn SuiteExecutor>,
    retry_attempts: u32,
    semaphore: Option<Arc<Semaphore>>,
    events: EventBus,
) -> SuiteOutcome {
    let _permit = match semaphore {
        Some(semaphore) => semaphore.acquire_owned().await.ok(),
        None => None,
    };

    events.emit(ProgressEvent::SuiteStarted {
        suite: name.clone(),
    });

    let timer = Timer::start(format!("suite {name}"));
    let max_attempts = retry_attempts.saturating_add(1);
    let mut attempt = 1;

    let mut outcome = loop {
        let outcome = match executor.execute(&config).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    "Suite '{}' attempt {}/{} errored: {}",
                    name, attempt, max_attempts, e
                );
                SuiteOutcome::from_error(&name, e.to_string())
            }
        };

        if outcome.success || attempt >= max_attempts {
            break outcome;
        }

        events.emit(ProgressEvent::SuiteRetrying {
            suite: name.clone(),
            attempt,
        });
        attempt += 1;
    };

    outcome.duration_ms = timer.stop();
    if retry_attempts > 0 {
        outcome
            .details
            .insert(DETAIL_ATTEMPTS.to_string(), Value::from(attempt));
    }
    outcome
}

fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
