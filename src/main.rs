//! dqa - Drive Quota Alert
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use dqa::cli::Cli;
use dqa::core::credentials::ConsolePrompt;
use dqa::core::logging;
use dqa::storage::{Config, ENV_CONFIG};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = cli
        .log_level
        .as_deref()
        .and_then(logging::LogLevel::from_arg)
        .or_else(logging::parse_log_level_from_env)
        .or_else(|| config_log_level(&cli))
        .unwrap_or_default();
    let log_format = if cli.json_output {
        logging::LogFormat::Json
    } else {
        logging::parse_log_format_from_env().unwrap_or_default()
    };
    let log_file = logging::parse_log_file_from_env();
    logging::init(log_level, log_format, log_file, cli.verbose);

    let mut prompt = ConsolePrompt;
    match dqa::cli::run(&cli, &mut prompt).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{e}");
            eprintln!("Error [{}]: {e}", e.error_code());
            if let Some(hint) = e.hint() {
                eprintln!("Hint: {hint}");
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// `general.log_level` from the config file. Load errors are ignored here and
/// reported once the command resolves its configuration.
fn config_log_level(cli: &Cli) -> Option<logging::LogLevel> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os(ENV_CONFIG).map(Into::into))
        .unwrap_or_else(Config::config_path);
    Config::load_from(&path)
        .ok()?
        .general
        .log_level
        .as_deref()
        .and_then(logging::LogLevel::from_arg)
}
