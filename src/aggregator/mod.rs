//! Result aggregation
//!
//! Folds per-suite outcomes into a weighted [`RunSummary`], run metrics, and
//! a recommendation list.

mod metrics;
mod rules;

pub use metrics::{EstimatedMetricsProvider, MetricsProvider};

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{default_score_weights, RecommendationThresholds, RunConfig};
use crate::error::AggregationError;
use crate::models::{
    RunMetrics, RunSummary, SuiteOutcome, SuiteStatus, DETAIL_CRITICAL_ISSUES,
    DETAIL_RECOMMENDATIONS,
};

/// Reduces outcomes into summaries
#[derive(Clone)]
pub struct ResultAggregator {
    weights: BTreeMap<String, f64>,
    thresholds: RecommendationThresholds,
    metrics: Arc<dyn MetricsProvider>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new(default_score_weights(), RecommendationThresholds::default())
    }
}

impl ResultAggregator {
    pub fn new(weights: BTreeMap<String, f64>, thresholds: RecommendationThresholds) -> Self {
        Self {
            weights,
            thresholds,
            metrics: Arc::new(EstimatedMetricsProvider::default()),
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.score_weights.clone(), config.thresholds.clone())
    }

    pub fn with_metrics_provider(mut self, provider: Arc<dyn MetricsProvider>) -> Self {
        self.metrics = provider;
        self
    }

    /// Summarize outcomes; recommendation order follows the input order
    pub fn generate_summary(&self, outcomes: &[&SuiteOutcome]) -> RunSummary {
        let mut summary = RunSummary {
            total_suites: outcomes.len(),
            ..Default::default()
        };

        let mut domain_totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        let mut seen_recommendations = BTreeSet::new();

        for outcome in outcomes {
            match outcome.status {
                SuiteStatus::Passed => summary.passed_suites += 1,
                SuiteStatus::Failed => summary.failed_suites += 1,
                SuiteStatus::Skipped => {
                    summary.skipped_suites += 1;
                    continue;
                }
            }
            summary.executed_suites += 1;

            summary.total_tests += u64::from(outcome.test_count);
            summary.passed_tests += u64::from(outcome.passed_tests);
            summary.failed_tests += u64::from(outcome.failed_tests);
            summary.skipped_tests += u64::from(outcome.skipped_tests);

            let entry = domain_totals.entry(domain_of(outcome)).or_insert((0.0, 0));
            entry.0 += outcome.score;
            entry.1 += 1;

            summary.critical_issues += critical_issues(outcome);

            for recommendation in recommendations(outcome) {
                if seen_recommendations.insert(recommendation.clone()) {
                    summary.recommendations.push(recommendation);
                }
            }
        }

        summary.domain_scores = domain_totals
            .into_iter()
            .map(|(domain, (sum, count))| (domain.to_string(), sum / count as f64))
            .collect();
        summary.overall_score = self.overall_score(&summary.domain_scores);

        debug!(
            "Summary: {} executed, {} passed, score {:.1}",
            summary.executed_suites, summary.passed_suites, summary.overall_score
        );
        summary
    }

    /// Weighted mean over present weighted domains, renormalized
    fn overall_score(&self, domain_scores: &BTreeMap<String, f64>) -> f64 {
        let weighted: Vec<(f64, f64)> = domain_scores
            .iter()
            .filter_map(|(domain, score)| {
                self.weights
                    .get(domain)
                    .filter(|w| **w > 0.0)
                    .map(|w| (*score, *w))
            })
            .collect();

        match weighted.as_slice() {
            [(score, _)] => *score,
            [] if domain_scores.is_empty() => 0.0,
            [] => domain_scores.values().sum::<f64>() / domain_scores.len() as f64,
            many => {
                let total_weight: f64 = many.iter().map(|(_, w)| w).sum();
                many.iter().map(|(s, w)| s * w).sum::<f64>() / total_weight
            }
        }
    }

    pub fn generate_metrics(&self, outcomes: &[&SuiteOutcome], total_duration: Duration) -> RunMetrics {
        self.metrics.collect(outcomes, total_duration)
    }

    /// Rule-based recommendations for a summary
    pub fn generate_recommendations(&self, summary: &RunSummary) -> Vec<String> {
        rules::evaluate(summary, &self.thresholds)
    }

    /// Suite recommendations followed by rule output, without duplicates
    pub fn recommendations(&self, summary: &RunSummary) -> Vec<String> {
        let mut seen = BTreeSet::new();
        summary
            .recommendations
            .iter()
            .cloned()
            .chain(self.generate_recommendations(summary))
            .filter(|r| seen.insert(r.clone()))
            .collect()
    }
}

fn domain_of(outcome: &SuiteOutcome) -> &str {
    if outcome.domain.is_empty() {
        &outcome.suite_name
    } else {
        &outcome.domain
    }
}

/// Declared critical issues, or 1 for an undeclared failure
fn critical_issues(outcome: &SuiteOutcome) -> u64 {
    let fallback = u64::from(!outcome.success);
    match outcome.details.get(DETAIL_CRITICAL_ISSUES) {
        None | Some(Value::Null) => fallback,
        Some(value) => match value.as_u64() {
            Some(count) => count,
            None => {
                report(AggregationError::MalformedDetail {
                    suite: outcome.suite_name.clone(),
                    key: DETAIL_CRITICAL_ISSUES,
                    found: value.to_string(),
                });
                fallback
            }
        },
    }
}

fn recommendations(outcome: &SuiteOutcome) -> Vec<String> {
    match outcome.details.get(DETAIL_RECOMMENDATIONS) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                other => {
                    report(AggregationError::MalformedDetail {
                        suite: outcome.suite_name.clone(),
                        key: DETAIL_RECOMMENDATIONS,
                        found: other.to_string(),
                    });
                    None
                }
            })
            .collect(),
        Some(other) => {
            report(AggregationError::MalformedDetail {
                suite: outcome.suite_name.clone(),
                key: DETAIL_RECOMMENDATIONS,
                found: other.to_string(),
            });
            Vec::new()
        }
    }
}

fn report(err: AggregationError) {
    warn!("{}; treating as absent", err);
}
