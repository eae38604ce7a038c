//! Unit Runner - data-driven parallel test execution
//!
//! Expands test classes into one execution unit per data row, runs them on
//! a bounded worker pool and reports the aggregated outcome.
//!
//! ## Features
//!
//! - Feeder pipeline that filters, duplicates, samples or fakes data rows
//! - Blocker groups that keep conflicting units from running together
//! - Heartbeat monitor that times out units that stop producing output
//! - Multiple output formats (Table, JSON, CSV, Summary)
//!
//! ## Usage
//!
//! ```bash
//! # Run a batch plan
//! unit-runner run --plan batch.yaml
//!
//! # Eight workers, CSV written to a file
//! unit-runner run --plan batch.yaml --workers 8 --output results.csv --format csv
//!
//! # List built-in feeders and test classes
//! unit-runner feeders
//! unit-runner classes
//!
//! # Create a configuration file
//! unit-runner config init
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, info};

mod cli;
mod config;
mod executor;
mod feeder;
mod models;
mod output;
mod plan;
mod results;
mod tests;
mod utils;

use cli::{Args, ConfigAction, RunArgs};
use config::{AppConfig, ConfigFile, EnvConfig};
use executor::Scheduler;
use feeder::{DataStorage, FeederRegistry};
use output::{write_report_to_file, OutputFormat, ResultFormatter};
use plan::BatchPlan;
use results::ReportSummary;
use tests::TestRegistry;
use utils::logger::{init_logger, LogLevel};
use utils::timer::{Phase, PhaseTimer};

/// Exit status when `--fail-on-failure` is set and a unit did not pass
const UNIT_FAILURE_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = AppConfig::resolve(args.config.as_deref())?;
    init_logger(LogLevel::resolve(&config.log_level, args.verbose));

    match args.command {
        cli::Command::Run(run_args) => run_batch(run_args, config).await,
        cli::Command::Feeders => {
            list_feeders();
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Classes => {
            list_classes();
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args.action, &config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_batch(args: RunArgs, mut config: AppConfig) -> Result<ExitCode> {
    if let Some(workers) = args.workers {
        config.max_workers = workers;
    }
    if let Some(tick) = args.tick_ms {
        config.tick_interval_ms = tick;
    }
    if let Some(timeout) = args.timeout {
        config.default_timeout_secs = timeout;
    }
    if args.sut_version.is_some() {
        config.version = args.sut_version.clone();
    }
    if args.tsid.is_some() {
        config.test_system_id = args.tsid.clone();
    }
    config.validate()?;

    let format_name = args
        .format
        .clone()
        .or(EnvConfig::load().format)
        .unwrap_or_else(|| "table".to_string());
    let format = OutputFormat::from_str(&format_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {format_name}"))?;

    let mut timer = PhaseTimer::start();
    let storage = DataStorage::new();
    let feeders = FeederRegistry::with_builtins(storage.clone());

    let plan = BatchPlan::load(&args.plan)?;
    let units = plan
        .expand(&feeders, config.default_timeout())
        .with_context(|| format!("Failed to expand plan {}", args.plan.display()))?;
    timer.finish(Phase::Plan);

    let scheduler = Scheduler::new(
        config.scheduler_config(),
        TestRegistry::with_builtins(),
        storage,
    );
    let report = scheduler.run(units).await.context("Batch run failed")?;
    timer.finish(Phase::Run);

    let summary = ReportSummary::new(report.aggregate, report.elapsed(), report.class_count())
        .with_version(config.version.clone())
        .with_test_system_id(config.test_system_id.clone());

    let formatter = ResultFormatter::new(format);
    if args.show_output {
        print!("{}", formatter.format_unit_output(&report));
    }
    println!("{}", formatter.format_report(&report, &summary));

    if let Some(path) = &args.output {
        write_report_to_file(path, &report, &summary, format)?;
        info!("Results written to {}", path.display());
    }
    timer.finish(Phase::Report);
    debug!("Timings: {}", timer);

    Ok(ExitCode::from(batch_exit_code(
        args.fail_on_failure,
        summary.aggregate.is_all_passed(),
    )))
}

/// Status for a batch that ran; startup errors leave `main` through `Err`
/// and exit with 1
fn batch_exit_code(fail_on_failure: bool, all_passed: bool) -> u8 {
    if fail_on_failure && !all_passed {
        UNIT_FAILURE_EXIT
    } else {
        0
    }
}

fn list_feeders() {
    let registry = FeederRegistry::with_builtins(DataStorage::new());

    println!("\nData Feeders\n");
    println!("──────────────────────────────────────────────────────────────────────");
    for (tag, description) in registry.list() {
        println!("  {tag:12} {description}");
    }
    println!();
}

fn list_classes() {
    let registry = TestRegistry::with_builtins();

    println!("\nTest Classes\n");
    println!("──────────────────────────────────────────────────────────────────────");
    for (name, description) in registry.list() {
        println!("  {name:20} {description}");
    }
    println!();
}

fn manage_config(action: ConfigAction, config: &AppConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let file = ConfigFile {
                app: config.clone(),
                ..ConfigFile::default()
            };
            print!(
                "{}",
                serde_yaml::to_string(&file).context("Failed to serialize config")?
            );

            let env = EnvConfig::load();
            if env.has_any() {
                println!();
                env.print_summary();
            }
        }
        ConfigAction::Init { path, force } => {
            let path = path.unwrap_or_else(ConfigFile::default_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            ConfigFile::example().save(&path)?;
            println!("Configuration written to {}", path.display());
        }
        ConfigAction::Env => config::print_env_help(),
    }
    Ok(())
}

#[cfg(test)]
mod main_tests {
    use super::*;

    #[test]
    fn test_batch_exit_code() {
        assert_eq!(batch_exit_code(false, false), 0);
        assert_eq!(batch_exit_code(true, true), 0);
        assert_eq!(batch_exit_code(true, false), UNIT_FAILURE_EXIT);
        assert_ne!(UNIT_FAILURE_EXIT, 1);
    }
}
