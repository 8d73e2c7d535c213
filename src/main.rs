//! Suite Orchestrator - dependency-aware test suite runner
//!
//! A CLI tool that plans declared test suites by priority and dependency,
//! runs them sequentially or in parallel batches, and reports a scored
//! summary with recommendations.
//!
//! ## Usage
//!
//! ```bash
//! # Write a starter configuration
//! suite-orchestrator config init
//!
//! # Preview the execution plan
//! suite-orchestrator plan
//!
//! # Run in parallel batches with a one hour budget
//! suite-orchestrator run --parallel --timeout 3600 --output results.json
//!
//! # Run a fixed order
//! suite-orchestrator run --order security,functional
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use suite_orchestrator::cli::{self, Args};
use suite_orchestrator::config::{print_env_help, ConfigFile, EnvConfig};
use suite_orchestrator::executor::ExecutorRegistry;
use suite_orchestrator::models::SuiteSpec;
use suite_orchestrator::monitor::{CancelHandle, CancellationMonitor, EmergencyStop};
use suite_orchestrator::output::{export_run, ExportFormat, OutputFormat, ResultFormatter};
use suite_orchestrator::planner::ExecutionPlanner;
use suite_orchestrator::scheduler::{LogListener, Scheduler};
use suite_orchestrator::utils::{init_logger, LogLevel};

const EXIT_FAILURE: u8 = 1;
const EXIT_TIMEOUT: u8 = 2;

// In-flight suites are dropped on runtime shutdown; never `process::exit` here.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let env_config = EnvConfig::load();

    init_logger(LogLevel::resolve(
        args.verbose,
        env_config.log_level.as_deref(),
    ));

    match args.command {
        cli::Command::Run(run_args) => {
            let code = run_suites(run_args, &env_config).await?;
            return Ok(ExitCode::from(code));
        }
        cli::Command::Plan(plan_args) => {
            show_plan(plan_args, &env_config)?;
        }
        cli::Command::List(list_args) => {
            list_suites(list_args, &env_config)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, &env_config)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load the config file: explicit path, then SUITE_ORCH_CONFIG, then discovery
fn load_config(path: Option<&str>, env_config: &EnvConfig) -> Result<ConfigFile> {
    match path.or(env_config.config_file.as_deref()) {
        Some(path) => ConfigFile::load(path),
        None => ConfigFile::load_default(),
    }
}

async fn run_suites(args: cli::RunArgs, env_config: &EnvConfig) -> Result<u8> {
    let file = load_config(args.config.as_deref(), env_config)?;
    let mut config = file.run;
    env_config.apply_to(&mut config);

    if args.parallel {
        config.parallel_execution = true;
    }
    if args.sequential {
        config.parallel_execution = false;
    }
    if !args.order.is_empty() {
        config.execution_order = args.order.clone();
    }
    if let Some(concurrent) = args.concurrent {
        config.max_concurrent_suites = Some(concurrent);
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = Some(timeout);
    }
    if args.no_emergency_stop {
        config.emergency_stop_enabled = false;
    }
    config.validate()?;

    let format_name = args
        .format
        .as_deref()
        .or(env_config.format.as_deref())
        .unwrap_or("table");
    let formatter = ResultFormatter::new(
        OutputFormat::from_str(format_name).unwrap_or_else(|| {
            warn!("Unknown output format '{}', using table", format_name);
            OutputFormat::Table
        }),
    );

    let handle = CancelHandle::new();
    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight suites");
            interrupt.cancel("interrupted");
        }
    });

    let monitor: Arc<dyn CancellationMonitor> = if config.emergency_stop_enabled {
        Arc::new(EmergencyStop::new(config.resource_limits.clone()).with_handle(handle))
    } else {
        Arc::new(handle)
    };

    let timeout = config.timeout_secs;
    let scheduler = Scheduler::new(file.suites, ExecutorRegistry::with_commands(), config)?
        .with_monitor(monitor)
        .with_listener(Arc::new(LogListener));

    info!(
        "Running {} suites ({})",
        scheduler.planner().enabled_suites().count(),
        if scheduler.config().parallel_execution {
            "parallel"
        } else {
            "sequential"
        }
    );

    let result = match timeout {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), scheduler.run()).await
        {
            Ok(result) => result,
            Err(_) => {
                error!("Run exceeded timeout of {}s", secs);
                println!("✗ Run timed out after {secs}s");
                return Ok(EXIT_TIMEOUT);
            }
        },
        None => scheduler.run().await,
    };

    println!("{}", formatter.format_run(&result));

    if let Some(output) = &args.output {
        let path = Path::new(output);
        let format = ExportFormat::from_extension(path).unwrap_or(ExportFormat::Json);
        export_run(&result, path, format)
            .with_context(|| format!("Failed to export results to {output}"))?;
        println!("✓ Results saved to: {output}");
    }

    Ok(if result.overall_success { 0 } else { EXIT_FAILURE })
}

fn show_plan(args: cli::PlanArgs, env_config: &EnvConfig) -> Result<()> {
    let file = load_config(args.config.as_deref(), env_config)?;
    let mut config = file.run;
    env_config.apply_to(&mut config);
    if !args.order.is_empty() {
        config.execution_order = args.order;
    }

    let planner = ExecutionPlanner::new(file.suites)?;
    let plan = planner.plan(&config.execution_order, config.parallel_execution);

    let formatter =
        ResultFormatter::new(OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table));
    println!("{}", formatter.format_plan(&plan));

    Ok(())
}

fn list_suites(args: cli::ListArgs, env_config: &EnvConfig) -> Result<()> {
    let file = load_config(args.config.as_deref(), env_config)?;

    if file.suites.is_empty() {
        println!("No suites declared. Run 'suite-orchestrator config init' to create an example.");
        return Ok(());
    }

    println!("\nDeclared Suites:");
    println!("{:-<70}", "");

    for suite in &file.suites {
        if args.detailed {
            print_suite_details(suite);
        } else {
            println!(
                "  {} {:24} {:12} priority {:>4}",
                if suite.enabled { "✓" } else { "○" },
                suite.name,
                suite.domain(),
                suite.priority
            );
        }
    }

    Ok(())
}

fn print_suite_details(suite: &SuiteSpec) {
    println!(
        "  {} {}{}",
        suite.name,
        suite.domain(),
        if suite.enabled { "" } else { " (disabled)" }
    );
    println!("    Priority: {}", suite.priority);
    if !suite.dependencies.is_empty() {
        let dependencies: Vec<&str> = suite.dependencies.iter().map(String::as_str).collect();
        println!("    Depends on: {}", dependencies.join(", "));
    }
    println!(
        "    Critical: {}, Skip on failure: {}",
        suite.critical_test, suite.skip_on_failure
    );
    if let Some(command) = suite.configuration.command() {
        println!("    Command: {command}");
    }
    println!();
}

fn manage_config(args: cli::ConfigArgs, env_config: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            ConfigFile::example().save(path)?;
            println!("✓ Configuration file created: {output}");
            println!("\nEdit the file to declare your suites.");
        }

        cli::ConfigAction::Show { format } => {
            let mut config = load_config(None, env_config)?;
            env_config.apply_to(&mut config.run);
            let output = if format == "json" {
                serde_json::to_string_pretty(&config)?
            } else {
                serde_yaml::to_string(&config)?
            };
            println!("{output}");
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .or_else(|| env_config.config_file.clone())
                .or_else(|| ConfigFile::find().map(|p| p.to_string_lossy().to_string()))
                .unwrap_or_else(|| "./suite-orchestrator.yaml".to_string());

            let checked = ConfigFile::load(&path)
                .and_then(|config| ExecutionPlanner::new(config.suites).map_err(Into::into));
            match checked {
                Ok(planner) => {
                    println!(
                        "✓ Configuration file is valid: {path} ({} enabled suites)",
                        planner.enabled_suites().count()
                    );
                }
                Err(e) => {
                    println!("✗ Configuration file is invalid: {path}");
                    println!("  Error: {e}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Env => {
            print_env_help();
            if env_config.has_any() {
                println!();
                env_config.print_summary();
            }
        }
    }

    Ok(())
}
