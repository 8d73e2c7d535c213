//! Suite scheduling
//!
//! A [`Scheduler`] plans the registry, drives every suite through its
//! executor either sequentially or in dependency batches, and assembles the
//! final [`RunResult`].
//!
//! Suite failures never escape as errors. Executor errors and panics become
//! failed outcomes; suites that never start because the run stopped early are
//! recorded as skipped.

mod events;
mod parallel;
mod sequential;
mod task;
#[cfg(test)]
pub(crate) mod testing;

pub use events::{ChannelListener, EventBus, LogListener, ProgressEvent, ProgressListener};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::aggregator::ResultAggregator;
use crate::config::RunConfig;
use crate::error::ConfigurationError;
use crate::executor::ExecutorRegistry;
use crate::models::{
    generate_run_id, AbortReason, RunPhase, RunResult, RunStatus, SuiteOutcome, SuiteSpec,
};
use crate::monitor::{CancellationMonitor, EmergencyStop, MonitorGuard, NeverCancel};
use crate::planner::{ExecutionPlan, ExecutionPlanner};
use crate::utils::{duration_ms, Clock, SystemClock};

use task::Settled;

/// Borrowed view of everything a run loop needs
pub(crate) struct RunContext<'a> {
    pub planner: &'a ExecutionPlanner,
    pub registry: &'a ExecutorRegistry,
    pub config: &'a RunConfig,
    pub guard: &'a MonitorGuard,
    pub events: &'a EventBus,
    pub semaphore: Option<Arc<Semaphore>>,
}

impl RunContext<'_> {
    /// Report a settled outcome
    fn finished(&self, outcome: &SuiteOutcome) {
        info!("  {}", outcome);
        self.events.emit(ProgressEvent::SuiteFinished {
            suite: outcome.suite_name.clone(),
            status: outcome.status,
            score: outcome.score,
            duration_ms: outcome.duration_ms,
        });
    }
}

/// Outcomes gathered by a run loop
#[derive(Debug, Default)]
pub(crate) struct ExecutionState {
    pub outcomes: BTreeMap<String, SuiteOutcome>,
    /// Names in the order their outcome was recorded
    pub completed: Vec<String>,
    pub abort: Option<AbortReason>,
    pub errors: Vec<String>,
}

impl ExecutionState {
    fn record(&mut self, settled: Settled) {
        let Settled { outcome, run_error } = settled;
        if let Some(error) = run_error {
            self.errors.push(error);
        }
        if self.outcomes.contains_key(&outcome.suite_name) {
            warn!(
                "Ignoring second outcome for suite '{}'",
                outcome.suite_name
            );
            return;
        }
        self.completed.push(outcome.suite_name.clone());
        self.outcomes.insert(outcome.suite_name.clone(), outcome);
    }

    /// Give every name without an outcome a skipped placeholder
    fn skip_unstarted(&mut self, ctx: &RunContext<'_>, order: &[String]) {
        let reason = match &self.abort {
            Some(abort) => format!("Not run: {abort}"),
            None => "Not run".to_string(),
        };

        for name in order {
            if self.outcomes.contains_key(name) {
                continue;
            }
            let mut outcome = SuiteOutcome::skipped(name, reason.clone());
            if let Some(spec) = ctx.planner.suite(name) {
                outcome.domain = spec.domain();
            }
            ctx.events.emit(ProgressEvent::SuiteSkipped {
                suite: name.clone(),
                reason: reason.clone(),
            });
            debug!("  {}", outcome);
            self.completed.push(name.clone());
            self.outcomes.insert(name.clone(), outcome);
        }
    }

    fn ordered(&self) -> Vec<&SuiteOutcome> {
        self.completed
            .iter()
            .filter_map(|name| self.outcomes.get(name))
            .collect()
    }
}

/// Runs one set of suites once
pub struct Scheduler {
    planner: ExecutionPlanner,
    registry: ExecutorRegistry,
    config: RunConfig,
    monitor: Option<Arc<dyn CancellationMonitor>>,
    clock: Arc<dyn Clock>,
    aggregator: ResultAggregator,
    events: EventBus,
    phase: RunPhase,
}

impl Scheduler {
    /// Validate suites and executors
    ///
    /// Fails when the registry is inconsistent or an enabled suite has no
    /// executor. Nothing runs until [`Scheduler::run`].
    pub fn new(
        suites: Vec<SuiteSpec>,
        registry: ExecutorRegistry,
        config: RunConfig,
    ) -> Result<Self, ConfigurationError> {
        let planner = ExecutionPlanner::new(suites)?;

        if let Some(missing) = planner
            .enabled_suites()
            .find(|suite| !registry.contains(&suite.name))
        {
            return Err(ConfigurationError::MissingExecutor(missing.name.clone()));
        }

        Ok(Self {
            aggregator: ResultAggregator::from_config(&config),
            planner,
            registry,
            config,
            monitor: None,
            clock: Arc::new(SystemClock),
            events: EventBus::default(),
            phase: RunPhase::Idle,
        })
    }

    /// Use this monitor instead of the configured default
    pub fn with_monitor(mut self, monitor: Arc<dyn CancellationMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.events.subscribe(listener);
        self
    }

    pub fn with_aggregator(mut self, aggregator: ResultAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn planner(&self) -> &ExecutionPlanner {
        &self.planner
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Plan without executing
    pub fn plan(&self) -> ExecutionPlan {
        self.planner.plan(
            &self.config.execution_order,
            self.config.parallel_execution,
        )
    }

    fn set_phase(&mut self, phase: RunPhase) {
        debug!("Scheduler phase {} -> {}", self.phase, phase);
        self.phase = phase;
        self.events.emit(ProgressEvent::PhaseChanged { phase });
    }

    fn resolve_monitor(&self) -> Arc<dyn CancellationMonitor> {
        match &self.monitor {
            Some(monitor) => Arc::clone(monitor),
            None if self.config.emergency_stop_enabled => {
                Arc::new(EmergencyStop::new(self.config.resource_limits.clone()))
            }
            None => Arc::new(NeverCancel),
        }
    }

    /// Execute the run
    pub async fn run(mut self) -> RunResult {
        let start_time = self.clock.now();
        let started = Instant::now();
        let run_id = generate_run_id(start_time);
        let parallel = self.config.parallel_execution;

        self.set_phase(RunPhase::Planning);
        let plan = self.plan();
        for warning in &plan.warnings {
            warn!("{}", warning);
        }

        info!(
            "Starting run {} with {} suites ({})",
            run_id,
            plan.suite_count(),
            if parallel {
                format!("{} batches", plan.batches.len())
            } else {
                "sequential".to_string()
            }
        );
        self.events.emit(ProgressEvent::RunStarted {
            run_id: run_id.clone(),
            suites: plan.suite_count(),
            parallel,
        });

        self.set_phase(RunPhase::Executing);
        let state = {
            let guard = MonitorGuard::start(self.resolve_monitor());
            let ctx = RunContext {
                planner: &self.planner,
                registry: &self.registry,
                config: &self.config,
                guard: &guard,
                events: &self.events,
                semaphore: self
                    .config
                    .max_concurrent_suites
                    .map(|n| Arc::new(Semaphore::new(n.max(1)))),
            };

            if parallel {
                parallel::run_in_parallel_batches(&ctx, &plan.batches).await
            } else {
                sequential::run_sequentially(&ctx, &plan.order).await
            }
        };

        match &state.abort {
            Some(reason) => {
                warn!("Run {} aborted: {}", run_id, reason);
                self.events.emit(ProgressEvent::RunAborted {
                    reason: reason.clone(),
                });
                self.set_phase(RunPhase::Aborted);
            }
            None => self.set_phase(RunPhase::Completed),
        }

        let elapsed = started.elapsed();
        let ordered = state.ordered();
        let summary = self.aggregator.generate_summary(&ordered);
        let metrics = self.aggregator.generate_metrics(&ordered, elapsed);
        let recommendations = self.aggregator.recommendations(&summary);

        let aborted = state.abort.is_some();
        let overall_success = !aborted
            && state.errors.is_empty()
            && state.outcomes.values().all(|o| o.success);

        let total_duration_ms = duration_ms(elapsed);
        info!(
            "Run {} completed in {}ms - Pass: {}/{} ({:.1}%) - Score: {:.1}",
            run_id,
            total_duration_ms,
            summary.passed_suites,
            summary.total_suites,
            if summary.total_suites == 0 {
                0.0
            } else {
                summary.passed_suites as f64 / summary.total_suites as f64 * 100.0
            },
            summary.overall_score
        );

        self.set_phase(RunPhase::Summarized);
        self.events.emit(ProgressEvent::RunFinished {
            run_id: run_id.clone(),
            overall_success,
            overall_score: summary.overall_score,
            duration_ms: total_duration_ms,
        });

        let ExecutionState {
            outcomes,
            abort,
            errors,
            ..
        } = state;

        RunResult {
            run_id,
            start_time,
            end_time: self.clock.now(),
            total_duration_ms,
            status: if aborted {
                RunStatus::Aborted
            } else {
                RunStatus::Completed
            },
            abort_reason: abort,
            overall_success,
            outcomes,
            execution_order: plan.order,
            batches: plan.batches,
            summary,
            metrics,
            recommendations,
            warnings: plan.warnings,
            errors,
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("suites", &self.planner.suites().len())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("listeners", &self.events.len())
            .finish()
    }
}
