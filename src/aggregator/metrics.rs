//! Run metrics providers

use std::time::Duration;

use crate::models::{RunMetrics, SuiteOutcome};
use crate::utils::duration_ms;

/// Source of resource and cost figures for a finished run
pub trait MetricsProvider: Send + Sync {
    fn collect(&self, outcomes: &[&SuiteOutcome], total_duration: Duration) -> RunMetrics;
}

/// Estimates usage from executed-suite count and suite time
#[derive(Clone, Debug)]
pub struct EstimatedMetricsProvider {
    /// CPU cores a running suite is assumed to occupy
    pub cpu_per_suite: f64,
    pub memory_mb_per_suite: u64,
    pub cost_per_cpu_hour_usd: f64,
}

impl Default for EstimatedMetricsProvider {
    fn default() -> Self {
        Self {
            cpu_per_suite: 1.0,
            memory_mb_per_suite: 256,
            cost_per_cpu_hour_usd: 0.05,
        }
    }
}

impl MetricsProvider for EstimatedMetricsProvider {
    fn collect(&self, outcomes: &[&SuiteOutcome], total_duration: Duration) -> RunMetrics {
        let executed: Vec<&SuiteOutcome> = outcomes
            .iter()
            .copied()
            .filter(|o| o.was_executed())
            .collect();

        let total_duration_ms = duration_ms(total_duration);
        let suite_time_ms: u64 = executed.iter().map(|o| o.duration_ms).sum();
        let parallelism = if total_duration_ms == 0 {
            0.0
        } else {
            suite_time_ms as f64 / total_duration_ms as f64
        };
        let estimated_cpu_seconds = suite_time_ms as f64 / 1000.0 * self.cpu_per_suite;

        RunMetrics {
            suites_executed: executed.len(),
            total_duration_ms,
            suite_time_ms,
            parallelism,
            estimated_cpu_seconds,
            estimated_memory_mb: executed.len() as u64 * self.memory_mb_per_suite,
            estimated_cost_usd: estimated_cpu_seconds / 3600.0 * self.cost_per_cpu_hour_usd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_ignores_skipped() {
        let a = SuiteOutcome::passed("a", 1, 100.0).with_duration_ms(3000);
        let b = SuiteOutcome::failed("b", 0, 1, 0.0).with_duration_ms(1000);
        let c = SuiteOutcome::skipped("c", "aborted");

        let metrics = EstimatedMetricsProvider::default()
            .collect(&[&a, &b, &c], Duration::from_millis(2000));

        assert_eq!(metrics.suites_executed, 2);
        assert_eq!(metrics.suite_time_ms, 4000);
        assert_eq!(metrics.parallelism, 2.0);
        assert_eq!(metrics.estimated_cpu_seconds, 4.0);
        assert_eq!(metrics.estimated_memory_mb, 512);
        assert!(metrics.estimated_cost_usd > 0.0);
    }

    #[test]
    fn test_empty_run() {
        let metrics = EstimatedMetricsProvider::default().collect(&[], Duration::ZERO);
        assert_eq!(metrics, RunMetrics::default());
    }
}
