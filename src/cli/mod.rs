//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Data-driven parallel test unit runner
#[derive(Parser, Debug)]
#[command(name = "unit-runner")]
#[command(version)]
#[command(about = "Run data-driven test classes in parallel with blocker groups and heartbeat timeouts")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a batch plan
    Run(RunArgs),

    /// List registered data feeders
    Feeders,

    /// List registered test classes
    Classes,

    /// Show or create configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Batch plan file (YAML or JSON)
    #[arg(short, long)]
    pub plan: PathBuf,

    /// Maximum units running at once
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Heartbeat monitor period in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Default unit timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Save results to file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the recorded output of every unit
    #[arg(long)]
    pub show_output: bool,

    /// Version of the system under test
    #[arg(long)]
    pub sut_version: Option<String>,

    /// Test system identifier
    #[arg(long)]
    pub tsid: Option<String>,

    /// Exit with a non-zero status when any unit failed
    #[arg(long)]
    pub fail_on_failure: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration
    Show,

    /// Write an example configuration file
    Init {
        /// Target path (defaults to ~/.config/unit-runner/config.yaml)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Describe the supported environment variables
    Env,
}
