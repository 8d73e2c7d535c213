//! Suite execution contract
//!
//! A [`SuiteExecutor`] runs one suite's configuration and reports an outcome.
//! The scheduler looks executors up by suite name in an [`ExecutorRegistry`].

mod command;

pub use command::{CommandExecutor, SuiteReport};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::SuiteExecutionError;
use crate::models::{SuiteConfig, SuiteOutcome};

/// Runs a single suite
///
/// Implementations may fail freely; the scheduler turns errors into failed
/// outcomes and never lets them escape the run.
#[async_trait]
pub trait SuiteExecutor: Send + Sync {
    async fn execute(&self, config: &SuiteConfig) -> Result<SuiteOutcome, SuiteExecutionError>;
}

/// Executors keyed by suite name
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: BTreeMap<String, Arc<dyn SuiteExecutor>>,
    fallback: Option<Arc<dyn SuiteExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that runs every suite through its configured command
    pub fn with_commands() -> Self {
        Self::new().with_fallback(Arc::new(CommandExecutor::new()))
    }

    pub fn register(mut self, suite: impl Into<String>, executor: Arc<dyn SuiteExecutor>) -> Self {
        self.insert(suite, executor);
        self
    }

    pub fn insert(&mut self, suite: impl Into<String>, executor: Arc<dyn SuiteExecutor>) {
        self.executors.insert(suite.into(), executor);
    }

    /// Executor used for suites without a dedicated registration
    pub fn with_fallback(mut self, executor: Arc<dyn SuiteExecutor>) -> Self {
        self.fallback = Some(executor);
        self
    }

    pub fn resolve(&self, suite: &str) -> Option<Arc<dyn SuiteExecutor>> {
        self.executors
            .get(suite)
            .or(self.fallback.as_ref())
            .cloned()
    }

    pub fn contains(&self, suite: &str) -> bool {
        self.resolve(suite).is_some()
    }
}

impl fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("suites", &self.executors.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
