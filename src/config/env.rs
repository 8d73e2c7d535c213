//! Environment variable configuration
//!
//! Provides environment variable overrides for run settings.

use std::env;

use super::RunConfig;

/// Environment variable prefix
const ENV_PREFIX: &str = "SUITE_ORCH";

/// Overrides read from the environment
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// Config file from SUITE_ORCH_CONFIG
    pub config_file: Option<String>,
    /// Parallel from SUITE_ORCH_PARALLEL
    pub parallel: Option<bool>,
    /// Concurrency cap from SUITE_ORCH_MAX_CONCURRENT
    pub max_concurrent: Option<usize>,
    /// Run timeout from SUITE_ORCH_TIMEOUT
    pub timeout: Option<u64>,
    /// Comma-separated order from SUITE_ORCH_ORDER
    pub order: Option<Vec<String>>,
    /// Output format from SUITE_ORCH_FORMAT
    pub format: Option<String>,
    /// Log level from SUITE_ORCH_LOG
    pub log_level: Option<String>,
    /// Emergency stop toggle from SUITE_ORCH_EMERGENCY_STOP
    pub emergency_stop: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            config_file: get_env("CONFIG"),
            parallel: get_env_bool("PARALLEL"),
            max_concurrent: get_env_parse("MAX_CONCURRENT"),
            timeout: get_env_parse("TIMEOUT"),
            order: get_env("ORDER").map(|v| parse_list(&v)),
            format: get_env("FORMAT"),
            log_level: get_env("LOG"),
            emergency_stop: get_env_bool("EMERGENCY_STOP"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }

    /// Overlay the values that are set onto `config`
    pub fn apply_to(&self, config: &mut RunConfig) {
        if let Some(parallel) = self.parallel {
            config.parallel_execution = parallel;
        }
        if let Some(max) = self.max_concurrent {
            config.max_concurrent_suites = Some(max);
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = Some(timeout);
        }
        if let Some(order) = &self.order {
            config.execution_order = order.clone();
        }
        if let Some(enabled) = self.emergency_stop {
            config.emergency_stop_enabled = enabled;
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {ENV_PREFIX}_CONFIG:          {:?}", self.config_file);
        println!("  {ENV_PREFIX}_PARALLEL:        {:?}", self.parallel);
        println!("  {ENV_PREFIX}_MAX_CONCURRENT:  {:?}", self.max_concurrent);
        println!("  {ENV_PREFIX}_TIMEOUT:         {:?}", self.timeout);
        println!("  {ENV_PREFIX}_ORDER:           {:?}", self.order);
        println!("  {ENV_PREFIX}_FORMAT:          {:?}", self.format);
        println!("  {ENV_PREFIX}_LOG:             {:?}", self.log_level);
        println!("  {ENV_PREFIX}_EMERGENCY_STOP:  {:?}", self.emergency_stop);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| parse_bool(&v))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

/// Split a comma-separated list, dropping blanks
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Print all SUITE_ORCH environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_CONFIG          Path to configuration file");
    println!("  {ENV_PREFIX}_PARALLEL        Run dependency batches in parallel (true/false)");
    println!("  {ENV_PREFIX}_MAX_CONCURRENT  Maximum concurrently running suites");
    println!("  {ENV_PREFIX}_TIMEOUT         Overall run timeout in seconds");
    println!("  {ENV_PREFIX}_ORDER           Explicit execution order (comma-separated)");
    println!("  {ENV_PREFIX}_FORMAT          Output format (table, json, json-pretty, csv, summary)");
    println!("  {ENV_PREFIX}_LOG             Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_EMERGENCY_STOP  Enable the emergency stop monitor (true/false)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_PARALLEL=true");
    println!("  export {ENV_PREFIX}_ORDER=security,functional,performance");
    println!("  suite-orchestrator run");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sets variables for the test's lifetime and restores them on drop
    struct EnvGuard {
        previous: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&str, &str)]) -> Self {
            let previous = vars
                .iter()
                .map(|(name, value)| {
                    let key = format!("{ENV_PREFIX}_{name}");
                    let old = env::var(&key).ok();
                    env::set_var(&key, value);
                    (key, old)
                })
                .collect();
            Self { previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.previous {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.parallel.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_env_load() {
        let _guard = EnvGuard::set(&[
            ("MAX_CONCURRENT", "3"),
            ("ORDER", "security, functional,,performance"),
            ("EMERGENCY_STOP", "off"),
        ]);

        let config = EnvConfig::load();
        assert_eq!(config.max_concurrent, Some(3));
        assert_eq!(
            config.order,
            Some(vec![
                "security".to_string(),
                "functional".to_string(),
                "performance".to_string()
            ])
        );
        assert_eq!(config.emergency_stop, Some(false));
        assert!(config.has_any());
    }

    #[test]
    fn test_apply_to_overlays_set_values() {
        let env = EnvConfig {
            parallel: Some(true),
            timeout: Some(120),
            ..Default::default()
        };
        let mut config = RunConfig::default().with_retries(2);
        env.apply_to(&mut config);

        assert!(config.parallel_execution);
        assert_eq!(config.timeout_secs, Some(120));
        assert_eq!(config.retry_attempts, 2);
        assert!(config.emergency_stop_enabled);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" yes "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }
}
