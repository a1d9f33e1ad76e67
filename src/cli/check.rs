//! Check command: one tick, then exit.

use crate::cli::args::CheckArgs;
use crate::cli::context::AppContext;
use crate::core::alert::TelegramDispatcher;
use crate::core::credentials::CodePrompt;
use crate::core::scheduler::{Scheduler, TickOutcome};
use crate::error::Result;
use crate::storage::ConfigOverrides;

/// Poll once and print the status line. With `--notify` the alert goes out
/// exactly as it would from the loop.
///
/// # Errors
/// Startup failures, and unlike the loop, a failed poll or dispatch.
pub async fn execute<P: CodePrompt>(
    args: &CheckArgs,
    overrides: &ConfigOverrides,
    prompt: &mut P,
) -> Result<()> {
    let ctx = AppContext::load(overrides)?;
    let policy = ctx.policy()?;
    let dispatcher: Option<TelegramDispatcher> = if args.notify {
        Some(ctx.dispatcher()?)
    } else {
        None
    };
    let client = ctx.authorize(prompt, false).await?;
    let poller = ctx.poller(client)?;

    let scheduler = Scheduler::new(poller, dispatcher, policy, ctx.config.interval);
    match scheduler.evaluate(args.notify).await {
        TickOutcome::PollFailed(e) | TickOutcome::DispatchFailed(_, e) => Err(e),
        TickOutcome::Triggered(_) => {
            println!("Threshold reached (use --notify to send the alert)");
            Ok(())
        }
        TickOutcome::Alerted(_) | TickOutcome::BelowThreshold(_) => Ok(()),
    }
}
