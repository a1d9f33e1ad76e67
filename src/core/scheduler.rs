//! The polling loop: poll, evaluate, maybe alert, wait.
//!
//! Ticks are strictly serial. A failed tick is logged and the next one runs
//! at the normal interval; nothing in here ends the loop except shutdown.

use std::future::Future;
use std::time::Duration;

use chrono::Local;
use tokio::time::{MissedTickBehavior, interval};

use crate::core::alert::{AlertSink, format_alert};
use crate::core::models::QuotaSnapshot;
use crate::core::policy::AlertPolicy;
use crate::core::quota::QuotaSource;
use crate::error::DqaError;
use crate::util::{format_bytes, format_clock, format_percent};

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Threshold reached and the alert was delivered.
    Alerted(QuotaSnapshot),
    /// Polled successfully, nothing to send.
    BelowThreshold(QuotaSnapshot),
    /// The quota could not be read.
    PollFailed(DqaError),
    /// Threshold reached but delivery failed.
    DispatchFailed(QuotaSnapshot, DqaError),
    /// Threshold reached with notification disabled (`check` without `--notify`).
    Triggered(QuotaSnapshot),
}

impl TickOutcome {
    #[must_use]
    pub const fn snapshot(&self) -> Option<&QuotaSnapshot> {
        match self {
            Self::Alerted(s)
            | Self::BelowThreshold(s)
            | Self::Triggered(s)
            | Self::DispatchFailed(s, _) => Some(s),
            Self::PollFailed(_) => None,
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::PollFailed(_) | Self::DispatchFailed(..))
    }
}

/// Counters kept across ticks, for the shutdown summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub alerts: u64,
    pub poll_failures: u64,
    pub dispatch_failures: u64,
}

impl RunStats {
    fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Alerted(_) => self.alerts += 1,
            TickOutcome::BelowThreshold(_) | TickOutcome::Triggered(_) => {}
            TickOutcome::PollFailed(_) => self.poll_failures += 1,
            TickOutcome::DispatchFailed(..) => self.dispatch_failures += 1,
        }
    }
}

/// Status line printed after each successful poll.
#[must_use]
pub fn status_line(snapshot: &QuotaSnapshot) -> String {
    format!(
        "[{}] Storage usage: {} ({} of {})",
        format_clock(&snapshot.taken_at),
        format_percent(snapshot.used_percent()),
        format_bytes(snapshot.usage_bytes),
        format_bytes(snapshot.limit_bytes),
    )
}

/// Drives a [`QuotaSource`] and an [`AlertSink`] on a fixed interval.
#[derive(Debug)]
pub struct Scheduler<P, D> {
    poller: P,
    dispatcher: D,
    policy: AlertPolicy,
    interval: Duration,
}

impl<P: QuotaSource, D: AlertSink> Scheduler<P, D> {
    #[must_use]
    pub const fn new(poller: P, dispatcher: D, policy: AlertPolicy, interval: Duration) -> Self {
        Self {
            poller,
            dispatcher,
            policy,
            interval,
        }
    }

    #[must_use]
    pub const fn poller(&self) -> &P {
        &self.poller
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// One poll/evaluate/dispatch cycle.
    pub async fn tick(&self) -> TickOutcome {
        self.evaluate(true).await
    }

    /// Poll and print, dispatching only when `notify` is set.
    pub async fn evaluate(&self, notify: bool) -> TickOutcome {
        let snapshot = match self.poller.poll().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    code = e.error_code(),
                    "Failed to read storage quota, will retry next interval"
                );
                eprintln!("[{}] Failed to read storage quota: {e}", format_clock(&Local::now()));
                return TickOutcome::PollFailed(e);
            }
        };

        println!("{}", status_line(&snapshot));

        if !self.policy.should_alert(&snapshot) {
            tracing::debug!(
                used_percent = snapshot.used_percent(),
                threshold = self.policy.threshold_percent(),
                "Below threshold"
            );
            return TickOutcome::BelowThreshold(snapshot);
        }

        if !notify {
            tracing::info!(
                used_percent = snapshot.used_percent(),
                "Threshold reached, notification disabled"
            );
            return TickOutcome::Triggered(snapshot);
        }

        match self.dispatcher.dispatch(&format_alert(&snapshot)).await {
            Ok(()) => {
                println!("Alert sent to chat {}", self.dispatcher.destination());
                tracing::info!(used_percent = snapshot.used_percent(), "Alert dispatched");
                TickOutcome::Alerted(snapshot)
            }
            Err(e) => {
                tracing::error!(error = %e, code = e.error_code(), "Alert dispatch failed");
                eprintln!("Failed to send alert: {e}");
                TickOutcome::DispatchFailed(snapshot, e)
            }
        }
    }

    /// Tick immediately, then once per interval, until `shutdown` resolves.
    ///
    /// Shutdown is only observed between ticks; an in-flight tick finishes.
    pub async fn run_until<S>(&self, shutdown: S) -> RunStats
    where
        S: Future<Output = ()>,
    {
        let mut stats = RunStats::default();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!(ticks = stats.ticks, "Shutdown requested, stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.tick().await;
                    stats.record(&outcome);
                }
            }
        }

        stats
    }
}

/// Resolves on the first Ctrl+C. The signal is awaited on a spawned task and
/// forwarded through a oneshot.
pub fn ctrl_c() -> impl Future<Output = ()> + Send {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
            return;
        }
        let _ = shutdown_tx.send(());
    });

    async move {
        // A dropped sender means the listener failed; keep running.
        if shutdown_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
