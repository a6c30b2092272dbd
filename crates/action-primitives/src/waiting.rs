//! Polling wait engine.
//!
//! Every synchronisation with the target application goes through
//! [`poll_until`]: check, and if the condition does not hold yet, sleep one
//! full poll interval (never less) before checking again. Check errors count as
//! "not yet" unless they are terminal for the session.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use cdp_adapter::{AdapterError, BrowserSession, ElementHandle};
use snapflow_core_types::Selector;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::ActionError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(2_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Keeps the poll interval, replaces the timeout.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

#[derive(Debug)]
pub enum WaitOutcome<T = ()> {
    Satisfied {
        value: T,
        elapsed: Duration,
        polls: u32,
    },
    TimedOut {
        elapsed: Duration,
        polls: u32,
        last_error: Option<String>,
    },
    Cancelled {
        elapsed: Duration,
        polls: u32,
    },
    /// A check hit an error that makes further polling pointless.
    Faulted {
        error: String,
        elapsed: Duration,
        polls: u32,
    },
}

impl<T> WaitOutcome<T> {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            WaitOutcome::Satisfied { elapsed, .. }
            | WaitOutcome::TimedOut { elapsed, .. }
            | WaitOutcome::Cancelled { elapsed, .. }
            | WaitOutcome::Faulted { elapsed, .. } => *elapsed,
        }
    }

    pub fn polls(&self) -> u32 {
        match self {
            WaitOutcome::Satisfied { polls, .. }
            | WaitOutcome::TimedOut { polls, .. }
            | WaitOutcome::Cancelled { polls, .. }
            | WaitOutcome::Faulted { polls, .. } => *polls,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            WaitOutcome::Satisfied { value, .. } => Some(value),
            _ => None,
        }
    }

    fn discard(self) -> WaitOutcome {
        match self {
            WaitOutcome::Satisfied { elapsed, polls, .. } => WaitOutcome::Satisfied {
                value: (),
                elapsed,
                polls,
            },
            WaitOutcome::TimedOut {
                elapsed,
                polls,
                last_error,
            } => WaitOutcome::TimedOut {
                elapsed,
                polls,
                last_error,
            },
            WaitOutcome::Cancelled { elapsed, polls } => WaitOutcome::Cancelled { elapsed, polls },
            WaitOutcome::Faulted {
                error,
                elapsed,
                polls,
            } => WaitOutcome::Faulted {
                error,
                elapsed,
                polls,
            },
        }
    }
}

/// Errors a check may return while polling.
pub trait PollError: fmt::Display {
    /// Terminal errors stop the wait immediately instead of being retried.
    fn is_terminal(&self) -> bool {
        false
    }
}

impl PollError for AdapterError {
    fn is_terminal(&self) -> bool {
        self.is_session_fault()
    }
}

impl PollError for ActionError {
    fn is_terminal(&self) -> bool {
        self.is_fatal()
    }
}

impl PollError for String {}

/// Polls `check` until it yields a value, the timeout elapses, or `cancel` fires.
pub async fn poll_until<T, E, F, Fut>(
    policy: &WaitPolicy,
    cancel: &CancellationToken,
    mut check: F,
) -> WaitOutcome<T>
where
    E: PollError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = Instant::now();
    let mut polls = 0u32;
    let mut last_error = None;

    loop {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled {
                elapsed: start.elapsed(),
                polls,
            };
        }

        polls += 1;
        match check().await {
            Ok(Some(value)) => {
                return WaitOutcome::Satisfied {
                    value,
                    elapsed: start.elapsed(),
                    polls,
                }
            }
            Ok(None) => {}
            Err(err) if err.is_terminal() => {
                return WaitOutcome::Faulted {
                    error: err.to_string(),
                    elapsed: start.elapsed(),
                    polls,
                }
            }
            Err(err) => {
                debug!(poll = polls, error = %err, "check failed, treating as not ready");
                last_error = Some(err.to_string());
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.timeout {
            return WaitOutcome::TimedOut {
                elapsed,
                polls,
                last_error,
            };
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                return WaitOutcome::Cancelled {
                    elapsed: start.elapsed(),
                    polls,
                };
            }
            _ = sleep(policy.poll_interval) => {}
        }
    }
}

/// Boolean form of [`poll_until`].
pub async fn wait_until<E, F, Fut>(
    policy: &WaitPolicy,
    cancel: &CancellationToken,
    mut predicate: F,
) -> WaitOutcome
where
    E: PollError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    poll_until(policy, cancel, || {
        let fut = predicate();
        async move { fut.await.map(|ready| ready.then_some(())) }
    })
    .await
    .discard()
}

/// Waits for `selector` to match and hands back the located element.
pub async fn wait_for_element(
    session: &dyn BrowserSession,
    selector: &Selector,
    policy: &WaitPolicy,
    cancel: &CancellationToken,
) -> WaitOutcome<Box<dyn ElementHandle>> {
    let outcome = poll_until(policy, cancel, || session.find_element(selector)).await;
    debug!(
        selector = %selector,
        polls = outcome.polls(),
        elapsed_ms = outcome.elapsed().as_millis() as u64,
        satisfied = outcome.is_satisfied(),
        "element wait finished"
    );
    outcome
}

/// Sleeps for `delay` unless cancelled first. Returns `false` when cancelled.
pub async fn settle_delay(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(delay) => true,
    }
}
