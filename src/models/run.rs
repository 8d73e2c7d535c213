//! Run-level models
//!
//! The aggregate result handed to reporters once a run finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::outcome::SuiteOutcome;

/// Scheduler lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Planning,
    Executing,
    Completed,
    Aborted,
    Summarized,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Planning => "planning",
            RunPhase::Executing => "executing",
            RunPhase::Completed => "completed",
            RunPhase::Aborted => "aborted",
            RunPhase::Summarized => "summarized",
        };
        f.write_str(name)
    }
}

/// How execution ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Aborted,
}

/// Why execution stopped early
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// A suite's failure policy stopped the run
    SuiteFailure { suite: String },
    /// The cancellation monitor requested a stop
    Cancelled { reason: String },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::SuiteFailure { suite } => write!(f, "suite '{suite}' failed"),
            AbortReason::Cancelled { reason } => write!(f, "cancelled: {reason}"),
        }
    }
}

/// Aggregate counts and scores over all outcomes
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_suites: usize,
    pub executed_suites: usize,
    pub passed_suites: usize,
    pub failed_suites: usize,
    pub skipped_suites: usize,
    pub total_tests: u64,
    pub passed_tests: u64,
    pub failed_tests: u64,
    pub skipped_tests: u64,
    /// Weighted 0..=100 quality score
    pub overall_score: f64,
    /// Mean score per domain that produced an outcome
    pub domain_scores: BTreeMap<String, f64>,
    pub critical_issues: u64,
    pub recommendations: Vec<String>,
}

impl RunSummary {
    /// Failed tests as a fraction of all tests
    pub fn failure_ratio(&self) -> f64 {
        if self.total_tests == 0 {
            0.0
        } else {
            self.failed_tests as f64 / self.total_tests as f64
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total_tests == 0 {
            0.0
        } else {
            (self.passed_tests as f64 / self.total_tests as f64) * 100.0
        }
    }
}

/// Resource and cost estimate for a run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub suites_executed: usize,
    pub total_duration_ms: u64,
    /// Sum of per-suite durations
    pub suite_time_ms: u64,
    /// suite_time / wall time; above 1.0 when batches overlapped
    pub parallelism: f64,
    pub estimated_cpu_seconds: f64,
    pub estimated_memory_mb: u64,
    pub estimated_cost_usd: f64,
}

/// Result of one scheduler run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub status: RunStatus,
    pub abort_reason: Option<AbortReason>,
    pub overall_success: bool,
    pub outcomes: BTreeMap<String, SuiteOutcome>,
    /// Planned execution order
    pub execution_order: Vec<String>,
    /// Planned batches; a single batch per suite in sequential mode
    pub batches: Vec<Vec<String>>,
    pub summary: RunSummary,
    pub metrics: RunMetrics,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl RunResult {
    /// Outcomes in planned execution order
    pub fn ordered_outcomes(&self) -> impl Iterator<Item = &SuiteOutcome> {
        self.execution_order
            .iter()
            .filter_map(|name| self.outcomes.get(name))
    }

    pub fn is_aborted(&self) -> bool {
        self.status == RunStatus::Aborted
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} ({:?})", self.run_id, self.status)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for outcome in self.ordered_outcomes() {
            writeln!(f, "  {outcome}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Suites: {} | Pass: {} | Fail: {} | Skip: {}",
            self.summary.total_suites,
            self.summary.passed_suites,
            self.summary.failed_suites,
            self.summary.skipped_suites
        )?;
        writeln!(
            f,
            "Score: {:.1} | Critical issues: {} | Duration: {}ms",
            self.summary.overall_score, self.summary.critical_issues, self.total_duration_ms
        )
    }
}

/// Generate unique run ID
pub fn generate_run_id(now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_ratio() {
        let summary = RunSummary {
            total_tests: 20,
            failed_tests: 5,
            passed_tests: 15,
            ..Default::default()
        };
        assert_eq!(summary.failure_ratio(), 0.25);
        assert_eq!(summary.pass_rate(), 75.0);
        assert_eq!(RunSummary::default().failure_ratio(), 0.0);
    }

    #[test]
    fn test_generate_run_id() {
        let now = Utc::now();
        let id = generate_run_id(now);
        assert!(id.starts_with(&now.format("%Y%m%d_").to_string()));
        assert_eq!(id.len(), "20240101_120000_0000".len());
    }

    #[test]
    fn test_abort_reason_display() {
        let reason = AbortReason::SuiteFailure {
            suite: "functional".to_string(),
        };
        assert_eq!(reason.to_string(), "suite 'functional' failed");
    }
}
