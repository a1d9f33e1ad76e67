//! Watch command: the long-running polling loop.

use crate::cli::context::AppContext;
use crate::core::credentials::CodePrompt;
use crate::core::scheduler::{Scheduler, ctrl_c};
use crate::error::Result;
use crate::storage::ConfigOverrides;

const BANNER_RULE: &str = "-------------------------------------------";

/// Run the loop until Ctrl+C. `--interval` and `--threshold` arrive through
/// `overrides`.
///
/// # Errors
/// Only startup failures (configuration, Telegram settings, authorization).
/// Per-tick failures are logged and the loop keeps going.
pub async fn execute<P: CodePrompt>(overrides: &ConfigOverrides, prompt: &mut P) -> Result<()> {
    let ctx = AppContext::load(overrides)?;
    let policy = ctx.policy()?;
    let dispatcher = ctx.dispatcher()?;
    let client = ctx.authorize(prompt, false).await?;
    let poller = ctx.poller(client)?;

    println!("{BANNER_RULE}");
    println!("Drive quota alert running, checking every {}s", ctx.config.interval.as_secs());
    println!("{BANNER_RULE}");
    tracing::info!(
        interval_secs = ctx.config.interval.as_secs(),
        threshold = policy.threshold_percent(),
        chat_id = dispatcher.chat_id(),
        "Starting quota watch"
    );

    let scheduler = Scheduler::new(poller, dispatcher, policy, ctx.config.interval);
    let stats = scheduler.run_until(ctrl_c()).await;

    println!(
        "Stopped after {} check(s): {} alert(s), {} failed check(s), {} failed alert(s)",
        stats.ticks, stats.alerts, stats.poll_failures, stats.dispatch_failures
    );
    Ok(())
}
