//! Pageflow demo CLI.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use pageflow_cli::cli::{
    Cli, Command, ConfigArgs, LogFormatArg, LogLevelArg, RunArgs, ScenarioArg,
};
use pageflow_cli::container::Transcript;
use pageflow_cli::logging::{LogConfig, LogFormat, init_logging};
use pageflow_cli::scenario::Scenario;
use pageflow_cli::settings::Settings;
use pageflow_cli::summary::{print_scenarios, print_summary};
use tracing::level_filters::LevelFilter;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match &cli.command {
        Command::Run(args) => match run_scenario(&cli, args) {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Scenarios => {
            print_scenarios();
            0
        }
        Command::Config(args) => match show_config(&cli, args) {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
    };
    std::process::exit(exit_code);
}

fn run_scenario(cli: &Cli, args: &RunArgs) -> anyhow::Result<()> {
    let mut settings = Settings::load(cli.config.as_deref());
    if let Some(latency_ms) = args.latency_ms {
        settings.demo.latency_ms = latency_ms;
    }
    if let Some(max_workers) = args.max_workers {
        settings.bridge = settings.bridge.with_max_workers(max_workers);
    }
    settings.bridge.validate()?;

    let scenario = match args.scenario {
        ScenarioArg::QuickStart => Scenario::QuickStart,
        ScenarioArg::UserManagement => Scenario::UserManagement,
    };
    let transcript = if args.quiet_views {
        Transcript::default()
    } else {
        Transcript::echoing()
    };
    let report = scenario.run(&settings, transcript)?;
    print_summary(&report);
    Ok(())
}

fn show_config(cli: &Cli, args: &ConfigArgs) -> anyhow::Result<()> {
    let path = cli.config.clone().unwrap_or_else(Settings::config_path);
    if args.init {
        Settings::default().save_to(&path)?;
        println!("Wrote default settings to {}", path.display());
        return Ok(());
    }
    let settings = Settings::load(Some(path.as_path()));
    println!("# {}", path.display());
    print!("{}", settings.to_toml()?);
    Ok(())
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
