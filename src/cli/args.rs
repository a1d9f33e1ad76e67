//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::storage::ConfigOverrides;

/// Drive Quota Alert - watch Google Drive storage and alert on Telegram.
#[derive(Parser, Debug)]
#[command(name = "dqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Config file (default: platform config dir, or $DQA_CONFIG)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// The command to run; `watch` with defaults when none was given.
    #[must_use]
    pub fn command_or_default(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Watch(WatchArgs::default()))
    }
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Poll the quota forever and alert when over the threshold (default)
    Watch(WatchArgs),

    /// Poll once, print the usage and exit
    Check(CheckArgs),

    /// Authorize Drive access and store the token
    Auth(AuthArgs),
}

impl Commands {
    /// CLI values that take precedence over env and the config file.
    #[must_use]
    pub fn overrides(&self, config_path: Option<PathBuf>) -> ConfigOverrides {
        let (interval_secs, threshold_percent) = match self {
            Self::Watch(args) => (args.interval, args.threshold),
            Self::Check(args) => (None, args.threshold),
            Self::Auth(_) => (None, None),
        };
        ConfigOverrides {
            config_path,
            interval_secs,
            threshold_percent,
        }
    }
}

/// Arguments for the `watch` command.
#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    /// Seconds between checks (default: 3600)
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Alert when usage is at or above this percentage (default: 0)
    #[arg(long, value_name = "PERCENT")]
    pub threshold: Option<f64>,
}

/// Arguments for the `check` command.
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Alert when usage is at or above this percentage (default: 0)
    #[arg(long, value_name = "PERCENT")]
    pub threshold: Option<f64>,

    /// Send the Telegram alert if the threshold is reached
    #[arg(long)]
    pub notify: bool,
}

/// Arguments for the `auth` command.
#[derive(Args, Debug, Clone, Default)]
pub struct AuthArgs {
    /// Ignore the stored token and authorize again
    #[arg(long)]
    pub force: bool,
}
