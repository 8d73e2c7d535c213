//! Suite outcome models
//!
//! Defines per-suite results and their status.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Detail key carrying the number of critical findings
pub const DETAIL_CRITICAL_ISSUES: &str = "criticalIssues";
/// Detail key carrying suite-level recommendations
pub const DETAIL_RECOMMENDATIONS: &str = "recommendations";
/// Detail key recording how many attempts were made
pub const DETAIL_ATTEMPTS: &str = "attempts";

/// Terminal status of a suite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteStatus {
    Passed,
    Failed,
    /// Never started because the run was aborted
    Skipped,
}

impl SuiteStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            SuiteStatus::Passed => "✓",
            SuiteStatus::Failed => "✗",
            SuiteStatus::Skipped => "○",
        }
    }
}

impl fmt::Display for SuiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuiteStatus::Passed => write!(f, "PASS"),
            SuiteStatus::Failed => write!(f, "FAIL"),
            SuiteStatus::Skipped => write!(f, "SKIP"),
        }
    }
}

/// Result of a single suite
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuiteOutcome {
    pub suite_name: String,
    /// Scoring domain; stamped by the scheduler
    #[serde(default)]
    pub domain: String,
    pub status: SuiteStatus,
    pub success: bool,
    pub duration_ms: u64,
    pub test_count: u32,
    pub passed_tests: u32,
    pub failed_tests: u32,
    pub skipped_tests: u32,
    /// Always within 0..=100
    pub score: f64,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl SuiteOutcome {
    /// Successful outcome with the given test counts
    pub fn passed(suite_name: impl Into<String>, test_count: u32, score: f64) -> Self {
        Self {
            suite_name: suite_name.into(),
            domain: String::new(),
            status: SuiteStatus::Passed,
            success: true,
            duration_ms: 0,
            test_count,
            passed_tests: test_count,
            failed_tests: 0,
            skipped_tests: 0,
            score: clamp_score(score),
            details: Map::new(),
            errors: Vec::new(),
        }
    }

    /// Failed outcome with the given counts
    pub fn failed(
        suite_name: impl Into<String>,
        passed_tests: u32,
        failed_tests: u32,
        score: f64,
    ) -> Self {
        Self {
            suite_name: suite_name.into(),
            domain: String::new(),
            status: SuiteStatus::Failed,
            success: false,
            duration_ms: 0,
            test_count: passed_tests.saturating_add(failed_tests),
            passed_tests,
            failed_tests,
            skipped_tests: 0,
            score: clamp_score(score),
            details: Map::new(),
            errors: Vec::new(),
        }
    }

    /// Synthetic failure standing in for an executor error
    pub fn from_error(suite_name: impl Into<String>, error: impl Into<String>) -> Self {
        let mut outcome = Self::failed(suite_name, 0, 1, 0.0);
        outcome.errors.push(error.into());
        outcome
    }

    /// Placeholder for a suite that never started
    pub fn skipped(suite_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            domain: String::new(),
            status: SuiteStatus::Skipped,
            success: false,
            duration_ms: 0,
            test_count: 0,
            passed_tests: 0,
            failed_tests: 0,
            skipped_tests: 0,
            score: 0.0,
            details: Map::new(),
            errors: vec![reason.into()],
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_skipped_tests(mut self, skipped: u32) -> Self {
        self.skipped_tests = skipped;
        self.test_count += skipped;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_critical_issues(self, count: u64) -> Self {
        self.with_detail(DETAIL_CRITICAL_ISSUES, Value::from(count))
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        let entry = self
            .details
            .entry(DETAIL_RECOMMENDATIONS)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(Value::String(recommendation.into()));
        }
        self
    }

    /// Whether the suite actually ran
    pub fn was_executed(&self) -> bool {
        self.status != SuiteStatus::Skipped
    }

    /// Re-establish the status/score invariants after an executor built the outcome
    pub fn normalize(&mut self) {
        self.score = clamp_score(self.score);
        if self.status != SuiteStatus::Skipped {
            self.status = if self.success {
                SuiteStatus::Passed
            } else {
                SuiteStatus::Failed
            };
        }
    }
}

impl fmt::Display for SuiteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms] score {:.1} ({}/{} passed)",
            self.status.symbol(),
            self.suite_name,
            self.duration_ms,
            self.score,
            self.passed_tests,
            self.test_count
        )?;
        if let Some(first) = self.errors.first() {
            write!(f, " - {first}")?;
        }
        Ok(())
    }
}

/// Clamp a score into 0..=100, mapping NaN to 0
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(SuiteOutcome::passed("a", 1, 140.0).score, 100.0);
        assert_eq!(SuiteOutcome::failed("a", 0, 1, -3.0).score, 0.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
    }

    #[test]
    fn test_failed_test_count_saturates() {
        let outcome = SuiteOutcome::failed("load", u32::MAX, 2, 50.0);
        assert_eq!(outcome.test_count, u32::MAX);
        assert_eq!(outcome.failed_tests, 2);
    }

    #[test]
    fn test_from_error_is_synthetic_failure() {
        let outcome = SuiteOutcome::from_error("security", "scanner not found");
        assert!(!outcome.success);
        assert_eq!(outcome.status, SuiteStatus::Failed);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.failed_tests, 1);
        assert_eq!(outcome.errors, vec!["scanner not found".to_string()]);
    }

    #[test]
    fn test_skipped_is_distinct_from_failed() {
        let outcome = SuiteOutcome::skipped("performance", "run aborted");
        assert!(!outcome.success);
        assert!(!outcome.was_executed());
        assert_eq!(outcome.failed_tests, 0);
    }

    #[test]
    fn test_normalize_syncs_status() {
        let mut outcome = SuiteOutcome::passed("a", 3, 250.0);
        outcome.success = false;
        outcome.normalize();
        assert_eq!(outcome.status, SuiteStatus::Failed);
        assert_eq!(outcome.score, 100.0);
    }

    #[test]
    fn test_recommendations_accumulate() {
        let outcome = SuiteOutcome::passed("a", 1, 90.0)
            .with_recommendation("rotate keys")
            .with_recommendation("pin dependencies");
        let recs = outcome.details[DETAIL_RECOMMENDATIONS].as_array().unwrap();
        assert_eq!(recs.len(), 2);
    }
}
