//! Payment and response watchers.
//!
//! There is no push channel from the mailbox store, so readiness is
//! discovered by polling on a fixed tick. Each tick is one short store
//! round trip, bounded by a timeout so a slow store can never pile requests
//! up behind it. Cancellation is a watch channel: flip it to `true` and the
//! watcher returns at the next opportunity.
//!
//! Transient store faults and stale payment signals are logged and the loop
//! keeps ticking; only non-retryable protocol errors abort a watch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, warn};

use printvendo_llm::CompletionApi;
use printvendo_mailbox::Mailbox;
use printvendo_types::constants::{
    PAYMENT_POLL_INTERVAL_MS, PREVIEW_POLL_INTERVAL_MS, STORE_OP_TIMEOUT_MS,
};
use printvendo_types::{MachineId, PaymentKind};

use crate::error::{Result, SessionError};
use crate::manager::SessionManager;

/// Tick cadence and per-operation bound for one watcher.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Time between poll ticks.
    pub interval: Duration,
    /// Bound on the store operation inside one tick.
    pub op_timeout: Duration,
}

impl PollConfig {
    /// Cadence for payment and response checks.
    pub fn payment() -> Self {
        Self {
            interval: Duration::from_millis(PAYMENT_POLL_INTERVAL_MS),
            op_timeout: Duration::from_millis(STORE_OP_TIMEOUT_MS),
        }
    }

    /// Slower cadence for document-preview checks.
    pub fn preview() -> Self {
        Self {
            interval: Duration::from_millis(PREVIEW_POLL_INTERVAL_MS),
            op_timeout: Duration::from_millis(STORE_OP_TIMEOUT_MS),
        }
    }

    /// Override the tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the per-operation bound.
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }
}

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome<T> {
    /// The watched condition arrived.
    Completed(T),
    /// The cancellation channel fired first.
    Cancelled,
}

/// Poll until the payment for `kind` is confirmed and consumed.
///
/// Returns `Completed(())` once this process's poll won the confirmation,
/// `Cancelled` when the channel flips. Retryable errors and stale signals
/// keep the loop ticking.
pub async fn watch_payment<M, A>(
    manager: Arc<SessionManager<M, A>>,
    machine: MachineId,
    kind: PaymentKind,
    config: PollConfig,
    mut cancel: watch::Receiver<bool>,
) -> Result<WatchOutcome<()>>
where
    M: Mailbox,
    A: CompletionApi,
{
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    debug!(machine = %machine, "payment watch cancelled");
                    return Ok(WatchOutcome::Cancelled);
                }
            }
            _ = ticker.tick() => {
                match timeout(config.op_timeout, manager.poll_for_payment(&machine, kind)).await {
                    Err(_) => {
                        warn!(machine = %machine, "payment poll tick timed out");
                    }
                    Ok(Ok(poll)) if poll.paid => {
                        debug!(machine = %machine, kind = ?kind, "payment watch completed");
                        return Ok(WatchOutcome::Completed(()));
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) if e.is_retryable() => {
                        warn!(machine = %machine, error = %e, "transient store fault, will keep polling");
                    }
                    Ok(Err(SessionError::StaleSignal(reason))) => {
                        warn!(machine = %machine, reason = %reason, "ignoring stale payment signal");
                    }
                    Ok(Err(e)) => return Err(e),
                }
            }
        }
    }
}

/// Poll until the generated response is readable from the mailbox.
pub async fn watch_response<M, A>(
    manager: Arc<SessionManager<M, A>>,
    machine: MachineId,
    config: PollConfig,
    mut cancel: watch::Receiver<bool>,
) -> Result<WatchOutcome<String>>
where
    M: Mailbox,
    A: CompletionApi,
{
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    debug!(machine = %machine, "response watch cancelled");
                    return Ok(WatchOutcome::Cancelled);
                }
            }
            _ = ticker.tick() => {
                match timeout(config.op_timeout, manager.poll_response(&machine)).await {
                    Err(_) => {
                        warn!(machine = %machine, "response poll tick timed out");
                    }
                    Ok(Ok(poll)) if poll.ready => {
                        let text = poll.text.unwrap_or_default();
                        return Ok(WatchOutcome::Completed(text));
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) if e.is_retryable() => {
                        warn!(machine = %machine, error = %e, "transient store fault, will keep polling");
                    }
                    Ok(Err(e)) => return Err(e),
                }
            }
        }
    }
}
