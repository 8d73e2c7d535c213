//! Batch-parallel execution

use futures::future::join_all;
use tracing::{info, warn};

use super::events::ProgressEvent;
use super::task::SuiteTask;
use super::{ExecutionState, RunContext};
use crate::config::CancellationCheck;
use crate::models::AbortReason;

/// Run batches strictly in order, each batch's suites concurrently
///
/// A batch is fully joined before the next starts. After a batch in which a
/// `critical_test` suite failed, no further batches are launched; a critical
/// failure in the final batch leaves nothing to stop and is not an abort.
pub(crate) async fn run_in_parallel_batches(
    ctx: &RunContext<'_>,
    batches: &[Vec<String>],
) -> ExecutionState {
    let mut state = ExecutionState::default();
    let per_suite = ctx.config.cancellation_check == CancellationCheck::PerSuite;

    for (index, batch) in batches.iter().enumerate() {
        if ctx.guard.is_cancelled() {
            let reason = ctx.guard.reason();
            warn!("Cancellation requested before batch {}: {}", index + 1, reason);
            state.abort = Some(AbortReason::Cancelled { reason });
            break;
        }

        info!(
            "Batch {}/{}: running {} suite(s) in parallel",
            index + 1,
            batches.len(),
            batch.len()
        );
        ctx.events.emit(ProgressEvent::BatchStarted {
            index,
            total: batches.len(),
            suites: batch.clone(),
        });

        let mut tasks = Vec::with_capacity(batch.len());
        for name in batch {
            if per_suite && ctx.guard.is_cancelled() {
                let reason = ctx.guard.reason();
                warn!("Cancellation requested before '{}': {}", name, reason);
                state.abort = Some(AbortReason::Cancelled { reason });
                break;
            }
            tasks.push(SuiteTask::spawn(ctx, name));
        }

        let launched: Vec<String> = batch.iter().take(tasks.len()).cloned().collect();
        for settled in join_all(tasks.into_iter().map(SuiteTask::join)).await {
            ctx.finished(&settled.outcome);
            state.record(settled);
        }

        if state.abort.is_some() || index + 1 == batches.len() {
            break;
        }

        let critical_failure = launched.iter().find(|name| {
            let critical = ctx.planner.suite(name).is_some_and(|s| s.critical_test);
            critical && state.outcomes.get(*name).is_some_and(|o| !o.success)
        });
        if let Some(name) = critical_failure {
            warn!(
                "Critical suite '{}' failed; not launching remaining batches",
                name
            );
            state.abort = Some(AbortReason::SuiteFailure { suite: name.clone() });
            break;
        }
    }

    let order: Vec<String> = batches.iter().flatten().cloned().collect();
    state.skip_unstarted(ctx, &order);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SuiteStatus;
    use crate::monitor::MonitorGuard;
    use crate::scheduler::testing::{fixture, fixture_with, functional, Behaviour, TripAfter};
    use std::sync::Arc;

    fn batches(groups: &[&[&str]]) -> Vec<Vec<String>> {
        groups
            .iter()
            .map(|g| g.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_batches_run_in_order() {
        let fx = fixture(&[
            ("a", Behaviour::Sleep(30)),
            ("b", Behaviour::Pass(100.0)),
            ("c", Behaviour::Pass(100.0)),
        ]);
        let plan = batches(&[&["a", "b"], &["c"]]);

        let guard = fx.guard();
        let state = run_in_parallel_batches(&fx.context(&guard), &plan).await;

        // c must wait for the slow a
        let log = fx.log();
        assert_eq!(log.last().map(String::as_str), Some("c"));
        assert_eq!(state.outcomes.len(), 3);
        assert!(state.abort.is_none());
    }

    #[tokio::test]
    async fn test_non_critical_failure_continues() {
        let fx = fixture(&[("a", Behaviour::Fail), ("b", Behaviour::Pass(100.0))]);
        let plan = batches(&[&["a"], &["b"]]);

        let guard = fx.guard();
        let state = run_in_parallel_batches(&fx.context(&guard), &plan).await;

        assert!(state.abort.is_none());
        assert_eq!(state.outcomes["b"].status, SuiteStatus::Passed);
    }

    #[tokio::test]
    async fn test_cancellation_polled_at_batch_boundary() {
        let fx = fixture(&[
            ("a", Behaviour::Pass(100.0)),
            ("b", Behaviour::Pass(100.0)),
            ("c", Behaviour::Pass(100.0)),
        ]);
        let plan = batches(&[&["a", "b"], &["c"]]);

        // first boundary poll passes, the second trips
        let guard = MonitorGuard::start(Arc::new(TripAfter::new(1)));
        let state = run_in_parallel_batches(&fx.context(&guard), &plan).await;

        assert!(matches!(state.abort, Some(AbortReason::Cancelled { .. })));
        assert_eq!(state.outcomes["a"].status, SuiteStatus::Passed);
        assert_eq!(state.outcomes["b"].status, SuiteStatus::Passed);
        assert_eq!(state.outcomes["c"].status, SuiteStatus::Skipped);
    }

    #[tokio::test]
    async fn test_per_suite_cancellation_inside_batch() {
        let mut fx = fixture(&[("a", Behaviour::Pass(100.0)), ("b", Behaviour::Pass(100.0))]);
        fx.config.cancellation_check = CancellationCheck::PerSuite;
        let plan = batches(&[&["a", "b"]]);

        // polls: batch boundary, before a, then trips before b
        let guard = MonitorGuard::start(Arc::new(TripAfter::new(2)));
        let state = run_in_parallel_batches(&fx.context(&guard), &plan).await;

        assert!(matches!(state.abort, Some(AbortReason::Cancelled { .. })));
        assert_eq!(fx.log(), vec!["a"]);
        assert_eq!(state.outcomes["a"].status, SuiteStatus::Passed);
        assert_eq!(state.outcomes["b"].status, SuiteStatus::Skipped);
        assert_eq!(state.completed, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_critical_failure_in_final_batch_is_not_an_abort() {
        let specs = vec![functional("a"), functional("b").critical()];
        let fx = fixture_with(specs, &[("a", Behaviour::Pass(100.0)), ("b", Behaviour::Fail)]);
        let plan = batches(&[&["a"], &["b"]]);

        let guard = fx.guard();
        let state = run_in_parallel_batches(&fx.context(&guard), &plan).await;

        assert!(state.abort.is_none());
        assert_eq!(state.outcomes["b"].status, SuiteStatus::Failed);
        assert_eq!(state.completed, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_critical_failure_skips_later_batches() {
        let specs = vec![functional("a").critical(), functional("b")];
        let fx = fixture_with(specs, &[("a", Behaviour::Fail), ("b", Behaviour::Pass(100.0))]);
        let plan = batches(&[&["a"], &["b"]]);

        let guard = fx.guard();
        let state = run_in_parallel_batches(&fx.context(&guard), &plan).await;

        assert_eq!(
            state.abort,
            Some(AbortReason::SuiteFailure {
                suite: "a".to_string()
            })
        );
        assert_eq!(state.outcomes["b"].status, SuiteStatus::Skipped);
        assert_eq!(fx.log(), vec!["a"]);
    }
}
