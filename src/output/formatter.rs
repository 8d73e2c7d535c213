//! Output formatters for run results
//!
//! Provides table, JSON, CSV, and one-line summary renderings of a
//! [`RunResult`] or an [`ExecutionPlan`].

use crate::models::{RunResult, SuiteOutcome, SuiteStatus};
use crate::planner::ExecutionPlan;

/// CSV columns for one outcome row
pub(crate) const OUTCOME_CSV_HEADER: [&str; 11] = [
    "suite",
    "domain",
    "status",
    "success",
    "score",
    "test_count",
    "passed_tests",
    "failed_tests",
    "skipped_tests",
    "duration_ms",
    "errors",
];

pub(crate) fn outcome_record(outcome: &SuiteOutcome) -> [String; 11] {
    [
        outcome.suite_name.clone(),
        outcome.domain.clone(),
        outcome.status.to_string(),
        outcome.success.to_string(),
        format!("{:.1}", outcome.score),
        outcome.test_count.to_string(),
        outcome.passed_tests.to_string(),
        outcome.failed_tests.to_string(),
        outcome.skipped_tests.to_string(),
        outcome.duration_ms.to_string(),
        outcome.errors.join("; "),
    ]
}

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a finished run
    pub fn format_run(&self, result: &RunResult) -> String {
        match self.format {
            OutputFormat::Table => self.format_run_table(result),
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Csv => write_csv(
                OUTCOME_CSV_HEADER,
                result.ordered_outcomes().map(outcome_record),
            ),
            OutputFormat::Summary => self.format_run_brief(result),
        }
    }

    fn status_label(&self, status: SuiteStatus) -> String {
        let label = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return label;
        }
        let color = match status {
            SuiteStatus::Passed => "32",
            SuiteStatus::Failed => "31",
            SuiteStatus::Skipped => "33",
        };
        format!("\x1b[{color}m{label}\x1b[0m")
    }

    fn format_outcome_row(&self, outcome: &SuiteOutcome) -> String {
        format!(
            "{:20} {:12} {} {:>6.1} {:>4}/{:<4} [{:>7}ms]",
            outcome.suite_name,
            outcome.domain,
            self.status_label(outcome.status),
            outcome.score,
            outcome.passed_tests,
            outcome.test_count,
            outcome.duration_ms
        )
    }

    fn format_run_table(&self, result: &RunResult) -> String {
        let summary = &result.summary;
        let mut output = String::new();

        output.push_str("\n╔══════════════════════════════════════════════════════════════════╗\n");
        output.push_str(&format!(
            "║  Run {:28} {:>30}  ║\n",
            result.run_id,
            format!("{:?}", result.status)
        ));
        output.push_str("╠══════════════════════════════════════════════════════════════════╣\n");

        for outcome in result.ordered_outcomes() {
            output.push_str(&format!("║  {}\n", self.format_outcome_row(outcome)));
            if let Some(error) = outcome.errors.first() {
                output.push_str(&format!("║      └─ {error}\n"));
            }
        }

        output.push_str("╠══════════════════════════════════════════════════════════════════╣\n");
        output.push_str(&format!(
            "║  Suites: {} | Pass: {} | Fail: {} | Skip: {}\n",
            summary.total_suites, summary.passed_suites, summary.failed_suites, summary.skipped_suites
        ));
        output.push_str(&format!(
            "║  Tests: {} | Pass Rate: {:5.1}% | Critical Issues: {}\n",
            summary.total_tests,
            summary.pass_rate(),
            summary.critical_issues
        ));
        for (domain, score) in &summary.domain_scores {
            output.push_str(&format!("║    {domain:12} {score:>6.1}\n"));
        }
        output.push_str(&format!(
            "║  Overall Score: {:5.1} | Duration: {}ms\n",
            summary.overall_score, result.total_duration_ms
        ));
        if let Some(reason) = &result.abort_reason {
            output.push_str(&format!("║  Aborted: {reason}\n"));
        }
        output.push_str("╚══════════════════════════════════════════════════════════════════╝\n");

        if !result.recommendations.is_empty() {
            output.push_str("\n Recommendations:\n");
            for recommendation in &result.recommendations {
                output.push_str(&format!("   - {recommendation}\n"));
            }
        }
        if !result.warnings.is_empty() {
            output.push_str("\n Warnings:\n");
            for warning in &result.warnings {
                output.push_str(&format!("   ! {warning}\n"));
            }
        }
        if !result.errors.is_empty() {
            output.push_str("\n Errors:\n");
            for error in &result.errors {
                output.push_str(&format!("   ✗ {error}\n"));
            }
        }

        output
    }

    fn format_run_brief(&self, result: &RunResult) -> String {
        let summary = &result.summary;
        format!(
            "{} Run {}: {}/{} suites passed, score {:.1}, {} critical issues in {}ms",
            if result.overall_success { "✓" } else { "✗" },
            result.run_id,
            summary.passed_suites,
            summary.total_suites,
            summary.overall_score,
            summary.critical_issues,
            result.total_duration_ms
        )
    }

    /// Format an execution plan
    pub fn format_plan(&self, plan: &ExecutionPlan) -> String {
        match self.format {
            OutputFormat::Table => self.format_plan_table(plan),
            OutputFormat::Json => serde_json::to_string(plan).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(plan).unwrap_or_default(),
            OutputFormat::Csv => write_csv(
                ["batch", "position", "suite"],
                plan.batches.iter().enumerate().flat_map(|(batch, suites)| {
                    suites.iter().enumerate().map(move |(position, suite)| {
                        [
                            (batch + 1).to_string(),
                            (position + 1).to_string(),
                            suite.clone(),
                        ]
                    })
                }),
            ),
            OutputFormat::Summary => format!(
                "{} suites in {} batches: {}",
                plan.suite_count(),
                plan.batches.len(),
                plan.order.join(" -> ")
            ),
        }
    }

    fn format_plan_table(&self, plan: &ExecutionPlan) -> String {
        let mut output = String::new();

        output.push_str("\n═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(" Execution Plan ({} suites)\n", plan.suite_count()));
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        output.push_str(" Order:\n");
        for (i, name) in plan.order.iter().enumerate() {
            output.push_str(&format!("   {:2}. {}\n", i + 1, name));
        }

        output.push_str("\n Batches:\n");
        for (i, batch) in plan.batches.iter().enumerate() {
            output.push_str(&format!("   {:2}. [{}]\n", i + 1, batch.join(", ")));
        }

        if !plan.warnings.is_empty() {
            output.push_str(" ───────────────────────────────────────────────────────────\n");
            for warning in &plan.warnings {
                output.push_str(&format!("   ! {warning}\n"));
            }
        }

        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Render rows as CSV text
fn write_csv<H, R, I>(header: H, rows: I) -> String
where
    H: IntoIterator,
    H::Item: AsRef<[u8]>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
    I: IntoIterator<Item = R>,
{
    let render = || -> anyhow::Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(row)?;
        }
        let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(String::from_utf8(bytes)?)
    };
    render().unwrap_or_default()
}
