//! Configuration module
//!
//! Handles run settings, configuration files, and environment overrides.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings for a single run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Explicit execution order; empty means priority order
    pub execution_order: Vec<String>,

    /// Run dependency batches concurrently
    pub parallel_execution: bool,

    /// Cap on concurrently running suites within a batch
    pub max_concurrent_suites: Option<usize>,

    /// Overall run timeout, enforced by the caller
    pub timeout_secs: Option<u64>,

    /// Extra attempts for a failed suite
    pub retry_attempts: u32,

    /// Consult the emergency-stop monitor
    pub emergency_stop_enabled: bool,

    /// Where cancellation is polled
    pub cancellation_check: CancellationCheck,

    /// Limits enforced by the emergency stop
    pub resource_limits: ResourceLimits,

    /// Domain weights for the overall score
    pub score_weights: BTreeMap<String, f64>,

    /// Recommendation rule thresholds
    pub thresholds: RecommendationThresholds,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            execution_order: Vec::new(),
            parallel_execution: false,
            max_concurrent_suites: None,
            timeout_secs: None,
            retry_attempts: 0,
            emergency_stop_enabled: true,
            cancellation_check: CancellationCheck::default(),
            resource_limits: ResourceLimits::default(),
            score_weights: default_score_weights(),
            thresholds: RecommendationThresholds::default(),
        }
    }
}

impl RunConfig {
    pub fn parallel(mut self) -> Self {
        self.parallel_execution = true;
        self
    }

    pub fn with_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execution_order = order.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_suites = Some(max);
        self
    }

    pub fn with_retries(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_suites == Some(0) {
            anyhow::bail!("max_concurrent_suites must be at least 1");
        }
        if self.timeout_secs == Some(0) {
            anyhow::bail!("timeout_secs must be greater than 0");
        }
        for (domain, weight) in &self.score_weights {
            if !weight.is_finite() || *weight < 0.0 {
                anyhow::bail!("Invalid weight {} for domain '{}'", weight, domain);
            }
        }
        self.thresholds.validate()?;
        Ok(())
    }
}

/// Default domain weights
pub fn default_score_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("security".to_string(), 0.4),
        ("performance".to_string(), 0.3),
        ("functional".to_string(), 0.3),
    ])
}

/// When the scheduler polls for cancellation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationCheck {
    /// Between batches (and between suites in sequential runs)
    #[default]
    BatchBoundary,
    /// Additionally before launching each suite inside a batch
    PerSuite,
}

/// Resource and cost ceilings for a run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    pub max_duration_secs: Option<u64>,
    pub max_cost_usd: Option<f64>,
    pub max_memory_mb: Option<u64>,
}

impl ResourceLimits {
    pub fn is_unbounded(&self) -> bool {
        self.max_duration_secs.is_none() && self.max_cost_usd.is_none() && self.max_memory_mb.is_none()
    }
}

/// Thresholds for the recommendation rule table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    /// Minimum acceptable score per domain
    pub domain_scores: BTreeMap<String, f64>,
    /// Failed tests / total tests above which stability is flagged
    pub failure_ratio: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            domain_scores: BTreeMap::from([
                ("security".to_string(), 80.0),
                ("performance".to_string(), 70.0),
                ("functional".to_string(), 90.0),
            ]),
            failure_ratio: 0.1,
        }
    }
}

impl RecommendationThresholds {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.failure_ratio) {
            anyhow::bail!(
                "failure_ratio threshold must be within 0.0-1.0, got {}",
                self.failure_ratio
            );
        }
        for (domain, threshold) in &self.domain_scores {
            if !(0.0..=100.0).contains(threshold) {
                anyhow::bail!(
                    "Score threshold for '{}' must be within 0-100, got {}",
                    domain,
                    threshold
                );
            }
        }
        Ok(())
    }
}
