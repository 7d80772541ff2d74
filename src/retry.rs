//! Backoff retry for asynchronous operations
//!
//! Delays grow by a fixed-point multiplier from a base delay and are capped at a
//! maximum single delay. Every attempt and every sleep is raced against an
//! optional [`AbortSignal`].

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::abort::AbortSignal;

pub trait Backoff {
    /// Base delay in ms.
    fn base_delay_ms(&self) -> u64;

    /// Generates next delay given current delay.
    fn next_delay_ms(&self, curr_delay_ms: u64) -> u64;
}

/// Exponential backoff with a fixed-point multiplier (`multiplier / multiplier_base`).
///
/// `ExponentialBackoff::new(1000, 15, 10, 60_000)` starts at 1s and grows by 1.5x
/// per retry: 1000ms -> 1500ms -> 2250ms -> ... up to 60s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base_delay_ms: u64,
    multiplier: u64,
    multiplier_base: u64,
    max_delay_ms: u64,
}

impl ExponentialBackoff {
    pub fn new(base_delay_ms: u64, multiplier: u64, multiplier_base: u64, max_delay_ms: u64) -> Self {
        assert!(multiplier_base != 0);
        Self {
            base_delay_ms,
            multiplier,
            multiplier_base,
            max_delay_ms,
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            multiplier: 15,
            multiplier_base: 10,
            max_delay_ms: 60_000,
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms
    }

    fn next_delay_ms(&self, curr_delay_ms: u64) -> u64 {
        (curr_delay_ms.saturating_mul(self.multiplier) / self.multiplier_base).min(self.max_delay_ms)
    }
}

/// How long to keep trying and how fast to back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: ExponentialBackoff,
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Computes the attempt count so that the sum of backoff sleeps reaches `bound`.
    ///
    /// Saturates at `u32::MAX` attempts.
    pub fn for_bound(bound: Duration, backoff: ExponentialBackoff) -> Self {
        let bound_ms = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
        let mut delay = backoff.base_delay_ms();
        let mut elapsed = 0u64;
        let mut attempts = 1u32;

        while elapsed < bound_ms {
            let next = backoff.next_delay_ms(delay).max(1);
            if next == delay {
                // Capped: every remaining sleep is `delay` long.
                let remaining = bound_ms - elapsed;
                let sleeps = remaining / delay + u64::from(remaining % delay != 0);
                attempts = attempts.saturating_add(u32::try_from(sleeps).unwrap_or(u32::MAX));
                break;
            }
            elapsed = elapsed.saturating_add(delay);
            delay = next;
            attempts = attempts.saturating_add(1);
        }

        Self {
            backoff,
            max_attempts: attempts,
        }
    }

    /// Total time spent sleeping if every attempt fails.
    pub fn total_delay(&self) -> Duration {
        let mut delay = self.backoff.base_delay_ms();
        let mut total = 0u64;
        let mut sleeps = self.max_attempts.saturating_sub(1);
        while sleeps > 0 {
            let next = self.backoff.next_delay_ms(delay).max(1);
            if next == delay {
                total = total.saturating_add(delay.saturating_mul(u64::from(sleeps)));
                break;
            }
            total = total.saturating_add(delay);
            delay = next;
            sleeps -= 1;
        }
        Duration::from_millis(total)
    }
}

/// Why a retried operation gave up.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The abort signal fired; carries its reason.
    Aborted(String),
    /// The operation failed with a non-retryable error.
    Fatal(E),
    /// Every attempt failed with a retryable error; carries the last one.
    Exhausted { attempts: u32, last: E },
}

/// Runs `operation` until it succeeds, fails fatally, runs out of attempts or is aborted.
///
/// `is_retryable` classifies each error: retryable errors are logged at warn level and
/// retried after the next backoff delay, anything else is returned as [`RetryError::Fatal`]
/// without further attempts.
pub async fn retry_with_backoff<R, E, F, Fut>(
    name: &str,
    policy: &RetryPolicy,
    abort: Option<&AbortSignal>,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<R, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: std::fmt::Display,
{
    let mut delay = policy.backoff.base_delay_ms();
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if let Some(reason) = abort.and_then(|signal| signal.reason()) {
            return Err(RetryError::Aborted(reason));
        }

        let outcome = match abort {
            Some(signal) => tokio::select! {
                reason = signal.aborted() => return Err(RetryError::Aborted(reason)),
                outcome = operation(attempt) => outcome,
            },
            None => operation(attempt).await,
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) if !is_retryable(&err) => return Err(RetryError::Fatal(err)),
            Err(err) => err,
        };

        if attempt == max_attempts {
            error!(
                "Max attempts ({}) exceeded while running {}, returning with the last error: {}",
                max_attempts, name, err
            );
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: err,
            });
        }

        warn!(
            "Attempt {} of {} failed with {} while running {}. Retrying in {}ms",
            attempt, max_attempts, err, name, delay
        );

        let sleep = tokio::time::sleep(Duration::from_millis(delay));
        match abort {
            Some(signal) => tokio::select! {
                reason = signal.aborted() => return Err(RetryError::Aborted(reason)),
                _ = sleep => {}
            },
            None => sleep.await,
        }
        delay = policy.backoff.next_delay_ms(delay);
    }

    // max_attempts >= 1, the loop always returns
    unreachable!()
}
