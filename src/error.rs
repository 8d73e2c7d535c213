//! Error types
//!
//! Only [`ConfigurationError`] ever leaves the scheduler as an `Err`. Suite
//! failures are folded into the run result.

use thiserror::Error;

/// Fatal problems detected before any suite executes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Duplicate suite name: {0}")]
    DuplicateSuite(String),

    #[error("Suite '{suite}' depends on unknown suite '{dependency}'")]
    UnknownDependency { suite: String, dependency: String },

    #[error("Suite '{suite}' depends on disabled suite '{dependency}'")]
    DisabledDependency { suite: String, dependency: String },

    #[error("Invalid configuration for suite '{suite}': {reason}")]
    InvalidSuiteConfig { suite: String, reason: String },

    #[error("No executor registered for suite '{0}'")]
    MissingExecutor(String),
}

/// Errors raised by a suite executor
///
/// The scheduler converts every variant into a failed outcome.
#[derive(Error, Debug)]
pub enum SuiteExecutionError {
    #[error("Suite configuration has no command to run")]
    NoCommand,

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed suite report: {0}")]
    MalformedReport(String),

    #[error("Suite task panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Malformed outcome details found while aggregating
///
/// Never returned; the aggregator logs it and treats the value as absent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("Suite '{suite}' reported malformed '{key}': {found}")]
    MalformedDetail {
        suite: String,
        key: &'static str,
        found: String,
    },
}
