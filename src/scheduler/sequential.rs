//! Sequential execution

use tracing::{info, warn};

use super::events::ProgressEvent;
use super::task::SuiteTask;
use super::{ExecutionState, RunContext};
use crate::models::AbortReason;

/// Run suites one at a time in `order`
///
/// Cancellation is polled before every suite. A failed suite with
/// `skip_on_failure` ends the run; everything after it is skipped.
pub(crate) async fn run_sequentially(ctx: &RunContext<'_>, order: &[String]) -> ExecutionState {
    let mut state = ExecutionState::default();

    for (i, name) in order.iter().enumerate() {
        if ctx.guard.is_cancelled() {
            let reason = ctx.guard.reason();
            warn!("Cancellation requested before '{}': {}", name, reason);
            state.abort = Some(AbortReason::Cancelled { reason });
            break;
        }

        info!("[{}/{}] Running {}", i + 1, order.len(), name);
        let settled = SuiteTask::spawn(ctx, name).join().await;
        let failed = !settled.outcome.success;
        ctx.finished(&settled.outcome);
        state.record(settled);

        let stops_run = ctx.planner.suite(name).is_some_and(|s| s.skip_on_failure);
        // nothing left to stop after the last suite
        if failed && stops_run && i + 1 < order.len() {
            warn!("Suite '{}' failed with skip_on_failure set; stopping run", name);
            state.abort = Some(AbortReason::SuiteFailure { suite: name.clone() });
            break;
        }
    }

    state.skip_unstarted(ctx, order);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::{fixture, fixture_with, functional, Behaviour};
    use crate::models::SuiteStatus;

    #[tokio::test]
    async fn test_runs_in_order() {
        let fx = fixture(&[
            ("a", Behaviour::Pass(100.0)),
            ("b", Behaviour::Fail),
            ("c", Behaviour::Pass(90.0)),
        ]);
        let order = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let guard = fx.guard();
        let state = run_sequentially(&fx.context(&guard), &order).await;

        assert_eq!(fx.log(), vec!["a", "b", "c"]);
        assert_eq!(state.completed, order);
        assert!(state.abort.is_none());
        assert_eq!(state.outcomes["b"].status, SuiteStatus::Failed);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_everything() {
        let fx = fixture(&[("a", Behaviour::Pass(100.0)), ("b", Behaviour::Pass(100.0))]);
        fx.handle.cancel("operator stop");
        let order = vec!["a".to_string(), "b".to_string()];

        let guard = fx.guard();
        let state = run_sequentially(&fx.context(&guard), &order).await;

        assert!(fx.log().is_empty());
        assert_eq!(
            state.abort,
            Some(AbortReason::Cancelled {
                reason: "operator stop".to_string()
            })
        );
        assert!(state.outcomes.values().all(|o| o.status == SuiteStatus::Skipped));
    }

    #[tokio::test]
    async fn test_skip_on_failure_mid_order_stops_run() {
        let specs = vec![functional("a").skip_on_failure(), functional("b")];
        let fx = fixture_with(specs, &[("a", Behaviour::Fail), ("b", Behaviour::Pass(100.0))]);
        let order = vec!["a".to_string(), "b".to_string()];

        let guard = fx.guard();
        let state = run_sequentially(&fx.context(&guard), &order).await;

        assert_eq!(
            state.abort,
            Some(AbortReason::SuiteFailure {
                suite: "a".to_string()
            })
        );
        assert_eq!(state.outcomes["b"].status, SuiteStatus::Skipped);
    }

    #[tokio::test]
    async fn test_skip_on_failure_on_last_suite_is_not_an_abort() {
        let specs = vec![functional("a"), functional("b").skip_on_failure()];
        let fx = fixture_with(specs, &[("a", Behaviour::Pass(100.0)), ("b", Behaviour::Fail)]);
        let order = vec!["a".to_string(), "b".to_string()];

        let guard = fx.guard();
        let state = run_sequentially(&fx.context(&guard), &order).await;

        assert!(state.abort.is_none());
        assert_eq!(state.outcomes["b"].status, SuiteStatus::Failed);
        assert!(state.outcomes.values().all(|o| o.was_executed()));
    }
}
