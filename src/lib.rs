//! Suite Orchestrator - dependency-aware test suite scheduling
//!
//! Plans a set of declared test suites into a priority-ordered,
//! dependency-respecting execution order, runs them sequentially or in
//! parallel dependency batches, and aggregates their outcomes into a
//! scored run summary with recommendations.
//!
//! ## Usage
//!
//! ```no_run
//! use suite_orchestrator::config::RunConfig;
//! use suite_orchestrator::executor::ExecutorRegistry;
//! use suite_orchestrator::models::{CommandConfig, SuiteConfig, SuiteSpec};
//! use suite_orchestrator::scheduler::Scheduler;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let suites = vec![
//!     SuiteSpec::new("unit", SuiteConfig::Command(CommandConfig::new("cargo").arg("test")))
//!         .with_priority(90)
//!         .critical(),
//! ];
//! let scheduler = Scheduler::new(suites, ExecutorRegistry::with_commands(), RunConfig::default())?;
//! let result = scheduler.run().await;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod monitor;
pub mod output;
pub mod planner;
pub mod scheduler;
pub mod utils;

pub use aggregator::ResultAggregator;
pub use config::{ConfigFile, RunConfig};
pub use error::{ConfigurationError, SuiteExecutionError};
pub use executor::{ExecutorRegistry, SuiteExecutor};
pub use models::{RunResult, SuiteConfig, SuiteOutcome, SuiteSpec};
pub use planner::{ExecutionPlan, ExecutionPlanner};
pub use scheduler::Scheduler;
