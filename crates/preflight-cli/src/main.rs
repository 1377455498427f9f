//! `preflight` connectivity diagnostics.

use clap::{ColorChoice, Parser};
use preflight_cli::env::{load_dotenv, timeout_from_env};
use preflight_cli::logging::{LogConfig, LogFormat, init_logging};
use preflight_core::Style;
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{RunContext, run_all, run_db, run_env, run_ping, run_sheets};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    if let Err(error) = load_dotenv(cli.env_file.as_deref()) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
    let ctx = RunContext {
        style: style_from_cli(&cli),
        timeout: timeout_from_env(),
    };
    let exit_code = match cli.command {
        Command::Env => run_env(ctx),
        Command::Ping => run_ping(ctx),
        Command::Db => run_db(ctx),
        Command::Sheets => run_sheets(ctx),
        Command::All => run_all(ctx),
    };
    std::process::exit(exit_code);
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
    config.with_timestamps = cli.log_timestamps;
    config.with_target = cli.log_target;
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}

/// Report styling follows `--color`, detecting a terminal on stdout for `auto`.
fn style_from_cli(cli: &Cli) -> Style {
    let colored = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    };
    if colored {
        Style::colored()
    } else {
        Style::plain()
    }
}
