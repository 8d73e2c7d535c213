//! Configuration file management
//!
//! Handles finding, loading, and validating suite-orchestrator config files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::RunConfig;
use crate::models::{
    CommandConfig, FunctionalConfig, PerformanceConfig, SecurityConfig, Severity, SuiteConfig,
    SuiteSpec,
};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./suite-orchestrator.yaml",
    "./suite-orchestrator.yml",
    "./.suite-orchestrator.yaml",
    "~/.config/suite-orchestrator/config.yaml",
];

const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Full configuration file structure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// Run settings
    #[serde(default)]
    pub run: RunConfig,

    /// Declared suites
    #[serde(default)]
    pub suites: Vec<SuiteSpec>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            run: RunConfig::default(),
            suites: Vec::new(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// Dependency checks need the whole registry and happen when the planner
    /// is built; this only covers what a single file can get wrong on its own.
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        self.run.validate()?;

        let mut seen = BTreeSet::new();
        for suite in &self.suites {
            if !seen.insert(suite.name.as_str()) {
                anyhow::bail!("Duplicate suite name '{}'", suite.name);
            }
        }

        Ok(())
    }

    /// Look up a declared suite
    pub fn suite(&self, name: &str) -> Option<&SuiteSpec> {
        self.suites.iter().find(|s| s.name == name)
    }

    /// Generate example configuration
    pub fn example() -> Self {
        let security = SuiteSpec::new(
            "security",
            SuiteConfig::Security(SecurityConfig {
                targets: vec!["https://staging.example.com".to_string()],
                fail_on: Severity::High,
                command: Some(CommandConfig::new("./scripts/security-scan.sh")),
            }),
        )
        .with_priority(100)
        .critical();

        let functional = SuiteSpec::new(
            "functional",
            SuiteConfig::Functional(FunctionalConfig {
                filter: Some("smoke".to_string()),
                command: Some(CommandConfig::new("cargo").arg("test")),
            }),
        )
        .with_priority(90)
        .critical()
        .skip_on_failure();

        let performance = SuiteSpec::new(
            "performance",
            SuiteConfig::Performance(PerformanceConfig {
                target_rps: Some(500),
                max_p95_latency_ms: Some(250),
                duration_secs: 60,
                command: Some(CommandConfig::new("./scripts/load-test.sh")),
            }),
        )
        .with_priority(80)
        .depends_on("functional");

        Self {
            version: default_version(),
            run: RunConfig {
                parallel_execution: true,
                max_concurrent_suites: Some(4),
                timeout_secs: Some(3600),
                ..RunConfig::default()
            },
            suites: vec![security, functional, performance],
        }
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
