//! CLI argument parsing and command dispatch.

pub mod args;
pub mod auth;
pub mod check;
pub mod context;
pub mod watch;

pub use args::{AuthArgs, CheckArgs, Cli, Commands, WatchArgs};
pub use context::AppContext;

use crate::core::credentials::CodePrompt;
use crate::error::Result;

/// Run the selected command (default `watch`).
///
/// # Errors
/// Whatever the command returns; all of these are fatal.
pub async fn run<P: CodePrompt>(cli: &Cli, prompt: &mut P) -> Result<()> {
    let command = cli.command_or_default();
    let overrides = command.overrides(cli.config.clone());

    match &command {
        Commands::Watch(_) => watch::execute(&overrides, prompt).await,
        Commands::Check(args) => check::execute(args, &overrides, prompt).await,
        Commands::Auth(args) => auth::execute(args, &overrides, prompt).await,
    }
}
