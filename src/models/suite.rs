//! Suite declaration models
//!
//! Defines suite specs and their per-domain configuration variants.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use crate::error::ConfigurationError;

/// Declaration of a single schedulable suite
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuiteSpec {
    /// Unique suite name
    pub name: String,

    /// Disabled suites are never planned or executed
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Higher runs earlier
    #[serde(default)]
    pub priority: i32,

    /// Suites that must complete before this one
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    /// Failure halts subsequent batches in parallel mode
    #[serde(default)]
    pub critical_test: bool,

    /// Failure stops a sequential run
    #[serde(default)]
    pub skip_on_failure: bool,

    /// Domain-specific configuration
    pub configuration: SuiteConfig,
}

fn default_enabled() -> bool {
    true
}

impl SuiteSpec {
    pub fn new(name: impl Into<String>, configuration: SuiteConfig) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            priority: 0,
            dependencies: BTreeSet::new(),
            critical_test: false,
            skip_on_failure: false,
            configuration,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on(mut self, suite: impl Into<String>) -> Self {
        self.dependencies.insert(suite.into());
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical_test = true;
        self
    }

    pub fn skip_on_failure(mut self) -> Self {
        self.skip_on_failure = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Scoring domain this suite reports into
    pub fn domain(&self) -> String {
        self.configuration
            .domain()
            .map(str::to_string)
            .unwrap_or_else(|| self.name.clone())
    }

    /// Validate the suite's own configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.configuration
            .validate()
            .map_err(|reason| ConfigurationError::InvalidSuiteConfig {
                suite: self.name.clone(),
                reason,
            })
    }
}

/// Per-domain suite configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuiteConfig {
    Security(SecurityConfig),
    Performance(PerformanceConfig),
    Functional(FunctionalConfig),
    /// Plain command; scored under the suite's own name
    Command(CommandConfig),
    /// Externally executed suite with free-form settings
    Custom {
        #[serde(default)]
        domain: Option<String>,
        #[serde(default)]
        settings: serde_json::Value,
    },
}

impl SuiteConfig {
    /// Domain name used for score weighting, if the variant implies one
    pub fn domain(&self) -> Option<&str> {
        match self {
            SuiteConfig::Security(_) => Some("security"),
            SuiteConfig::Performance(_) => Some("performance"),
            SuiteConfig::Functional(_) => Some("functional"),
            SuiteConfig::Command(_) => None,
            SuiteConfig::Custom { domain, .. } => domain.as_deref(),
        }
    }

    /// Command attached to this configuration, if any
    pub fn command(&self) -> Option<&CommandConfig> {
        match self {
            SuiteConfig::Security(c) => c.command.as_ref(),
            SuiteConfig::Performance(c) => c.command.as_ref(),
            SuiteConfig::Functional(c) => c.command.as_ref(),
            SuiteConfig::Command(c) => Some(c),
            SuiteConfig::Custom { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            SuiteConfig::Security(c) => {
                if c.targets.iter().any(|t| t.trim().is_empty()) {
                    return Err("security targets must not be blank".to_string());
                }
            }
            SuiteConfig::Performance(c) => {
                if c.duration_secs == 0 {
                    return Err("performance duration_secs must be greater than 0".to_string());
                }
                if c.target_rps == Some(0) {
                    return Err("performance target_rps must be greater than 0".to_string());
                }
            }
            SuiteConfig::Functional(_) => {}
            SuiteConfig::Command(_) => {}
            SuiteConfig::Custom { domain, .. } => {
                if domain.as_deref().is_some_and(|d| d.trim().is_empty()) {
                    return Err("custom domain must not be blank".to_string());
                }
            }
        }

        match self.command() {
            Some(command) => command.validate(),
            None => Ok(()),
        }
    }
}

/// Security scan settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Scan targets (paths, hosts, images)
    #[serde(default)]
    pub targets: Vec<String>,
    /// Lowest severity that counts as a failure
    #[serde(default)]
    pub fail_on: Severity,
    #[serde(default)]
    pub command: Option<CommandConfig>,
}

/// Finding severity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    #[default]
    High,
    Critical,
}

/// Performance check settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default)]
    pub target_rps: Option<u32>,
    #[serde(default)]
    pub max_p95_latency_ms: Option<u64>,
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    #[serde(default)]
    pub command: Option<CommandConfig>,
}

fn default_duration_secs() -> u64 {
    60
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            target_rps: None,
            max_p95_latency_ms: None,
            duration_secs: default_duration_secs(),
            command: None,
        }
    }
}

/// Functional test settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionalConfig {
    /// Only run tests matching this filter
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub command: Option<CommandConfig>,
}

/// External command invocation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl CommandConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.program.trim().is_empty() {
            return Err("command program must not be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for CommandConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_from_variant() {
        let spec = SuiteSpec::new("sast", SuiteConfig::Security(SecurityConfig::default()));
        assert_eq!(spec.domain(), "security");

        let spec = SuiteSpec::new("lint", SuiteConfig::Command(CommandConfig::new("cargo")));
        assert_eq!(spec.domain(), "lint");
    }

    #[test]
    fn test_validate_rejects_empty_program() {
        let spec = SuiteSpec::new("lint", SuiteConfig::Command(CommandConfig::new("  ")));
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSuiteConfig { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let config = PerformanceConfig {
            duration_secs: 0,
            ..Default::default()
        };
        assert!(SuiteConfig::Performance(config).validate().is_err());
    }

    #[test]
    fn test_deserialize_tagged_config() {
        let yaml = r#"
name: security
priority: 100
critical_test: true
configuration:
  type: security
  targets: ["./src"]
  fail_on: critical
"#;
        let spec: SuiteSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.enabled);
        assert!(spec.critical_test);
        match spec.configuration {
            SuiteConfig::Security(c) => assert_eq!(c.fail_on, Severity::Critical),
            other => panic!("unexpected config: {other:?}"),
        }
    }
}
