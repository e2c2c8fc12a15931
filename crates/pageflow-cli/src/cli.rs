//! CLI argument definitions for the Pageflow demo host.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "pageflow-demo",
    version,
    about = "Pageflow demo - replay navigation, caching and state scenarios headlessly",
    long_about = "Run the Pageflow demo applications without a window.\n\n\
                  Each scenario scripts the clicks a user would make, prints what every\n\
                  view shows, and ends with a summary of the shared store and the\n\
                  navigation stack."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Settings file (default: platform config directory).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a demo scenario.
    Run(RunArgs),

    /// List the available scenarios.
    Scenarios,

    /// Show the effective settings as TOML.
    Config(ConfigArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Scenario to run.
    #[arg(value_enum, default_value = "user-management")]
    pub scenario: ScenarioArg,

    /// Simulated network latency per fetch, in milliseconds.
    #[arg(long = "latency-ms", value_name = "MS")]
    pub latency_ms: Option<u64>,

    /// Maximum number of concurrent background tasks.
    #[arg(long = "max-workers", value_name = "N")]
    pub max_workers: Option<usize>,

    /// Do not print view output, only the final summary.
    #[arg(long = "quiet-views")]
    pub quiet_views: bool,
}

#[derive(Parser)]
pub struct ConfigArgs {
    /// Write the default settings to the settings file.
    #[arg(long = "init")]
    pub init: bool,
}

/// Scenario choices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScenarioArg {
    QuickStart,
    UserManagement,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
