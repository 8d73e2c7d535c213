//! Scripted executors and monitors shared by the scheduler tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use super::events::EventBus;
use super::RunContext;
use crate::config::RunConfig;
use crate::error::SuiteExecutionError;
use crate::executor::{ExecutorRegistry, SuiteExecutor};
use crate::models::{FunctionalConfig, SuiteConfig, SuiteOutcome, SuiteSpec};
use crate::monitor::{CancelHandle, CancellationMonitor, MonitorGuard};
use crate::planner::ExecutionPlanner;

#[derive(Clone, Copy, Debug)]
pub enum Behaviour {
    Pass(f64),
    Fail,
    Error,
    Panic,
    /// Pass after sleeping this many milliseconds
    Sleep(u64),
    /// Trip the shared cancel handle, then pass
    Cancel,
    /// Fail this many times, then pass
    Flaky(u32),
}

/// Shared observation points for scripted executors
#[derive(Clone, Default)]
pub struct Script {
    log: Arc<Mutex<Vec<String>>>,
    finished: Arc<Mutex<Vec<String>>>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    pub handle: CancelHandle,
}

impl Script {
    pub fn executor(&self, name: &str, behaviour: Behaviour) -> Arc<dyn SuiteExecutor> {
        Arc::new(Scripted {
            name: name.to_string(),
            behaviour,
            calls: AtomicU32::new(0),
            script: self.clone(),
        })
    }

    pub fn registry(&self, behaviours: &[(&str, Behaviour)]) -> ExecutorRegistry {
        behaviours
            .iter()
            .fold(ExecutorRegistry::new(), |registry, (name, behaviour)| {
                registry.register(*name, self.executor(name, *behaviour))
            })
    }

    /// Suite names in the order execution started
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Suite names in the order execution returned
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }

    /// Highest number of suites observed running at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct Scripted {
    name: String,
    behaviour: Behaviour,
    calls: AtomicU32,
    script: Script,
}

#[async_trait]
impl SuiteExecutor for Scripted {
    async fn execute(&self, _config: &SuiteConfig) -> Result<SuiteOutcome, SuiteExecutionError> {
        self.script.log.lock().unwrap().push(self.name.clone());
        let now = self.script.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.script.peak.fetch_max(now, Ordering::SeqCst);

        let result = match self.behaviour {
            Behaviour::Pass(score) => Ok(SuiteOutcome::passed(&self.name, 1, score)),
            Behaviour::Fail => Ok(SuiteOutcome::failed(&self.name, 0, 1, 0.0)),
            Behaviour::Error => Err(SuiteExecutionError::Other(anyhow::anyhow!(
                "scripted error"
            ))),
            Behaviour::Panic => panic!("scripted panic"),
            Behaviour::Sleep(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(SuiteOutcome::passed(&self.name, 1, 100.0))
            }
            Behaviour::Cancel => {
                self.script.handle.cancel("cancelled by suite");
                Ok(SuiteOutcome::passed(&self.name, 1, 100.0))
            }
            Behaviour::Flaky(failures) => {
                if self.calls.fetch_add(1, Ordering::SeqCst) < failures {
                    Ok(SuiteOutcome::failed(&self.name, 0, 1, 0.0))
                } else {
                    Ok(SuiteOutcome::passed(&self.name, 1, 100.0))
                }
            }
        };

        self.script.running.fetch_sub(1, Ordering::SeqCst);
        self.script.finished.lock().unwrap().push(self.name.clone());
        result
    }
}

/// Planner, registry and config wired to scripted executors
pub struct Fixture {
    pub planner: ExecutionPlanner,
    pub registry: ExecutorRegistry,
    pub config: RunConfig,
    pub events: EventBus,
    pub handle: CancelHandle,
    script: Script,
}

/// Independent functional suites, one per behaviour
pub fn fixture(behaviours: &[(&str, Behaviour)]) -> Fixture {
    let specs = behaviours
        .iter()
        .map(|(name, _)| functional(name))
        .collect();
    fixture_with(specs, behaviours)
}

pub fn fixture_with(specs: Vec<SuiteSpec>, behaviours: &[(&str, Behaviour)]) -> Fixture {
    let script = Script::default();
    Fixture {
        planner: ExecutionPlanner::new(specs).unwrap(),
        registry: script.registry(behaviours),
        config: RunConfig::default(),
        events: EventBus::default(),
        handle: script.handle.clone(),
        script,
    }
}

pub fn functional(name: &str) -> SuiteSpec {
    SuiteSpec::new(name, SuiteConfig::Functional(FunctionalConfig::default()))
}

impl Fixture {
    /// Guard over the fixture's cancel handle
    pub fn guard(&self) -> MonitorGuard {
        MonitorGuard::start(Arc::new(self.handle.clone()))
    }

    pub fn context<'a>(&'a self, guard: &'a MonitorGuard) -> RunContext<'a> {
        RunContext {
            planner: &self.planner,
            registry: &self.registry,
            config: &self.config,
            guard,
            events: &self.events,
            semaphore: self
                .config
                .max_concurrent_suites
                .map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.script.log()
    }
}

/// Monitor that reports cancellation after `limit` polls
pub struct TripAfter {
    polls: AtomicUsize,
    limit: usize,
}

impl TripAfter {
    pub fn new(limit: usize) -> Self {
        Self {
            polls: AtomicUsize::new(0),
            limit,
        }
    }
}

impl CancellationMonitor for TripAfter {
    fn start(&self) {}
    fn stop(&self) {}

    fn is_cancelled(&self) -> bool {
        self.polls.fetch_add(1, Ordering::SeqCst) >= self.limit
    }

    fn reason(&self) -> Option<String> {
        Some("tripped".to_string())
    }
}

/// Monitor counting start/stop calls
#[derive(Default)]
pub struct Counting {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl CancellationMonitor for Counting {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}
