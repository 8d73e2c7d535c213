//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Dependency-aware test suite orchestrator
#[derive(Parser, Debug)]
#[command(name = "suite-orchestrator")]
#[command(version)]
#[command(about = "Plan, run, and score dependent test suites")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the configured suites
    Run(RunArgs),

    /// Show execution order and batches without running anything
    Plan(PlanArgs),

    /// List declared suites
    List(ListArgs),

    /// Manage configuration files
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Run dependency batches in parallel
    #[arg(short, long, conflicts_with = "sequential")]
    pub parallel: bool,

    /// Run suites one at a time
    #[arg(short, long)]
    pub sequential: bool,

    /// Explicit execution order (comma-separated suite names)
    #[arg(long, value_delimiter = ',')]
    pub order: Vec<String>,

    /// Maximum number of suites running at once
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// Overall run timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Save results to file (.json or .csv)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Disable the emergency stop monitor
    #[arg(long)]
    pub no_emergency_stop: bool,
}

/// Arguments for plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Explicit execution order (comma-separated suite names)
    #[arg(long, value_delimiter = ',')]
    pub order: Vec<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Show dependencies and configuration
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(default_value = "./suite-orchestrator.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (defaults to the discovered file)
        file: Option<String>,
    },

    /// Show environment variable overrides
    Env,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "suite-orchestrator",
            "run",
            "--parallel",
            "--order",
            "security,functional",
            "--concurrent",
            "2",
            "--no-emergency-stop",
        ]);
        match args.command {
            Command::Run(run) => {
                assert!(run.parallel);
                assert!(!run.sequential);
                assert_eq!(run.order, vec!["security", "functional"]);
                assert_eq!(run.concurrent, Some(2));
                assert!(run.no_emergency_stop);
                assert!(run.timeout.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parallel_conflicts_with_sequential() {
        let result =
            Args::try_parse_from(["suite-orchestrator", "run", "--parallel", "--sequential"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_verbose() {
        let args = Args::parse_from(["suite-orchestrator", "list", "--detailed", "-v"]);
        assert!(args.verbose);
        match args.command {
            Command::List(list) => assert!(list.detailed),
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_config_actions() {
        let args = Args::parse_from(["suite-orchestrator", "config", "init"]);
        match args.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { output, force },
            }) => {
                assert_eq!(output, "./suite-orchestrator.yaml");
                assert!(!force);
            }
            _ => panic!("Expected config init"),
        }

        let args = Args::parse_from(["suite-orchestrator", "config", "validate", "ci.yaml"]);
        assert!(matches!(
            args.command,
            Command::Config(ConfigArgs {
                action: ConfigAction::Validate { file: Some(ref f) },
            }) if f == "ci.yaml"
        ));
    }
}
