//! Recommendation rule table
//!
//! Every rule sees the finished summary; all matching rules fire, in table order.

use tracing::debug;

use crate::config::RecommendationThresholds;
use crate::models::RunSummary;

type Rule = fn(&RunSummary, &RecommendationThresholds) -> Vec<String>;

const RULES: &[(&str, Rule)] = &[
    ("domain_score", domain_score_rule),
    ("failure_ratio", failure_ratio_rule),
    ("critical_issues", critical_issues_rule),
];

/// Evaluate the rule table
pub fn evaluate(summary: &RunSummary, thresholds: &RecommendationThresholds) -> Vec<String> {
    let mut fired = Vec::new();
    for (name, rule) in RULES {
        let output = rule(summary, thresholds);
        if !output.is_empty() {
            debug!("Recommendation rule '{}' fired {} time(s)", name, output.len());
        }
        fired.extend(output);
    }
    fired
}

fn domain_score_rule(summary: &RunSummary, thresholds: &RecommendationThresholds) -> Vec<String> {
    thresholds
        .domain_scores
        .iter()
        .filter_map(|(domain, threshold)| {
            let score = *summary.domain_scores.get(domain)?;
            (score < *threshold).then(|| domain_advisory(domain, score, *threshold))
        })
        .collect()
}

fn domain_advisory(domain: &str, score: f64, threshold: f64) -> String {
    match domain {
        "security" => "Address security vulnerabilities before deployment".to_string(),
        "performance" => "Optimize performance bottlenecks and re-run load tests".to_string(),
        "functional" => "Fix failing functional tests to restore expected behaviour".to_string(),
        other => format!("Improve {other} results (score {score:.1} below {threshold:.1})"),
    }
}

fn failure_ratio_rule(summary: &RunSummary, thresholds: &RecommendationThresholds) -> Vec<String> {
    let ratio = summary.failure_ratio();
    if ratio > thresholds.failure_ratio {
        vec![format!(
            "High test failure rate ({:.1}%); stabilize failing tests before release",
            ratio * 100.0
        )]
    } else {
        Vec::new()
    }
}

fn critical_issues_rule(summary: &RunSummary, _: &RecommendationThresholds) -> Vec<String> {
    if summary.critical_issues > 0 {
        vec![format!(
            "Resolve {} critical issues before proceeding",
            summary.critical_issues
        )]
    } else {
        Vec::new()
    }
}
