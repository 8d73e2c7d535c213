//! Data models for suite orchestration
//!
//! Suite declarations, per-suite outcomes, and run-level results.

mod outcome;
mod run;
mod suite;

pub use outcome::{
    clamp_score, SuiteOutcome, SuiteStatus, DETAIL_ATTEMPTS, DETAIL_CRITICAL_ISSUES,
    DETAIL_RECOMMENDATIONS,
};
pub use run::{
    generate_run_id, AbortReason, RunMetrics, RunPhase, RunResult, RunStatus, RunSummary,
};
pub use suite::{
    CommandConfig, FunctionalConfig, PerformanceConfig, SecurityConfig, Severity, SuiteConfig,
    SuiteSpec,
};
