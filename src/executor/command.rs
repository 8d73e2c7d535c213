//! Command-backed suite executor
//!
//! Runs the command attached to a suite configuration. A command may print a
//! JSON [`SuiteReport`] as its last stdout line; otherwise its exit status
//! decides the outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

use super::SuiteExecutor;
use crate::error::SuiteExecutionError;
use crate::models::{SuiteConfig, SuiteOutcome};

/// Lines of stderr kept on failure
const STDERR_TAIL_LINES: usize = 5;

/// Machine-readable report a command may emit
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SuiteReport {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub test_count: Option<u32>,
    #[serde(default)]
    pub passed_tests: u32,
    #[serde(default)]
    pub failed_tests: u32,
    #[serde(default)]
    pub skipped_tests: u32,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub details: Map<String, Value>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl SuiteReport {
    /// Convert into an outcome; a failing exit status always fails the suite
    pub fn into_outcome(self, exit_ok: bool) -> SuiteOutcome {
        // counts come from untrusted output
        let counted = self
            .passed_tests
            .saturating_add(self.failed_tests)
            .saturating_add(self.skipped_tests);
        let test_count = self.test_count.unwrap_or(counted).max(counted);
        let executed = u64::from(self.passed_tests) + u64::from(self.failed_tests);
        let score = self.score.unwrap_or(if executed == 0 {
            if exit_ok {
                100.0
            } else {
                0.0
            }
        } else {
            self.passed_tests as f64 / executed as f64 * 100.0
        });
        let success = exit_ok && self.success.unwrap_or(self.failed_tests == 0);

        let mut outcome = if success {
            SuiteOutcome::passed("", 0, score)
        } else {
            SuiteOutcome::failed("", 0, 0, score)
        };
        outcome.test_count = test_count;
        outcome.passed_tests = self.passed_tests;
        outcome.failed_tests = self.failed_tests;
        outcome.skipped_tests = self.skipped_tests;
        outcome.details = self.details;
        outcome.errors = self.errors;
        outcome
    }
}

/// Executes suite commands with `tokio::process`
#[derive(Clone, Debug, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    fn build_command(config: &SuiteConfig) -> Result<Command, SuiteExecutionError> {
        let spec = config.command().ok_or(SuiteExecutionError::NoCommand)?;

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        // Domain settings reach the command through the environment
        match config {
            SuiteConfig::Security(c) => {
                cmd.env("SUITE_TARGETS", c.targets.join(","));
                cmd.env(
                    "SUITE_FAIL_ON",
                    format!("{:?}", c.fail_on).to_lowercase(),
                );
            }
            SuiteConfig::Performance(c) => {
                cmd.env("SUITE_DURATION_SECS", c.duration_secs.to_string());
                if let Some(rps) = c.target_rps {
                    cmd.env("SUITE_TARGET_RPS", rps.to_string());
                }
                if let Some(p95) = c.max_p95_latency_ms {
                    cmd.env("SUITE_MAX_P95_MS", p95.to_string());
                }
            }
            SuiteConfig::Functional(c) => {
                if let Some(filter) = &c.filter {
                    cmd.env("SUITE_FILTER", filter);
                }
            }
            SuiteConfig::Command(_) | SuiteConfig::Custom { .. } => {}
        }

        Ok(cmd)
    }
}

#[async_trait]
impl SuiteExecutor for CommandExecutor {
    async fn execute(&self, config: &SuiteConfig) -> Result<SuiteOutcome, SuiteExecutionError> {
        let mut cmd = Self::build_command(config)?;
        let program = config
            .command()
            .map(|c| c.to_string())
            .unwrap_or_default();

        debug!("Running command: {}", program);
        let start = Instant::now();
        let output = cmd.output().await.map_err(|source| SuiteExecutionError::Spawn {
            program: program.clone(),
            source,
        })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_ok = output.status.success();

        let outcome = match parse_report(&stdout)? {
            Some(report) => report.into_outcome(exit_ok),
            None if exit_ok => SuiteOutcome::passed("", 1, 100.0),
            None => SuiteOutcome::failed("", 0, 1, 0.0),
        };

        let mut outcome = outcome.with_duration_ms(duration_ms);
        if !exit_ok {
            let tail = stderr_tail(&stderr);
            let message = if tail.is_empty() {
                format!("'{}' exited with {}", program, output.status)
            } else {
                format!("'{}' exited with {}: {}", program, output.status, tail)
            };
            outcome.errors.push(message);
        }

        Ok(outcome)
    }
}

/// Parse a trailing JSON report line, if the command printed one
fn parse_report(stdout: &str) -> Result<Option<SuiteReport>, SuiteExecutionError> {
    let Some(last) = stdout.lines().rev().map(str::trim).find(|l| !l.is_empty()) else {
        return Ok(None);
    };
    if !last.starts_with('{') {
        return Ok(None);
    }
    serde_json::from_str(last)
        .map(Some)
        .map_err(|e| SuiteExecutionError::MalformedReport(e.to_string()))
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}
