//! Bounded, cancellation-aware retry of connection attempts.
//!
//! [`with_retry`] repeats a factory until it succeeds, the attempt budget is
//! spent, or the signal is cancelled. Only connection establishment should be
//! wrapped: once a stream is open and delivering messages, a failure ends that
//! session and a retry means constructing a fresh one.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::error::RetryError;

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Delay multiplied by `factor` after each failure, capped at `max_delay`
    Exponential { factor: u32, max_delay: Duration },
}

/// Attempt budget and delay between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts; zero is treated as one
    pub max_retries: usize,
    /// Wait before the first retry
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn fixed(max_retries: usize, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Doubling backoff starting at `delay`, never waiting longer than `max_delay`.
    pub fn exponential(max_retries: usize, delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            backoff: Backoff::Exponential {
                factor: 2,
                max_delay,
            },
        }
    }

    pub fn from_config(config: &StreamConfig) -> Self {
        Self::fixed(config.max_retries, config.retry_delay)
    }

    pub fn max_attempts(&self) -> usize {
        self.max_retries.max(1)
    }

    /// Wait applied after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { factor, max_delay } => {
                let exponent = attempt.saturating_sub(1).min(u32::MAX as usize) as u32;
                let multiplier = factor.max(1).checked_pow(exponent).unwrap_or(u32::MAX);
                self.delay.saturating_mul(multiplier).min(max_delay)
            }
        }
    }
}

/// Run `factory` until it succeeds, retrying every failure.
///
/// `factory` receives the 1-based attempt number. Returns `Ok(None)` when
/// `signal` is cancelled before an attempt succeeds, including while waiting
/// between attempts.
///
/// # Example
///
/// ```ignore
/// let open = with_retry(
///     |_| StreamSession::new(client.clone(), config.clone()).connect(&url, &payload, Some(signal.clone())),
///     &RetryPolicy::from_config(&config),
///     &signal,
/// )
/// .await?;
/// ```
pub async fn with_retry<T, E, F, Fut>(
    factory: F,
    policy: &RetryPolicy,
    signal: &CancellationToken,
) -> Result<Option<T>, RetryError<E>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    with_retry_if(factory, policy, signal, |_| true).await
}

/// Like [`with_retry`], but stops at the first error `should_retry` rejects.
pub async fn with_retry_if<T, E, F, Fut, P>(
    mut factory: F,
    policy: &RetryPolicy,
    signal: &CancellationToken,
    mut should_retry: P,
) -> Result<Option<T>, RetryError<E>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: FnMut(&E) -> bool,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        if signal.is_cancelled() {
            info!(attempt, "Retry cancelled before attempt");
            return Ok(None);
        }

        debug!(attempt, max_attempts, "Starting attempt");

        let err = match factory(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!(attempt, "Succeeded after retry");
                }
                return Ok(Some(value));
            }
            Err(err) => err,
        };

        if !should_retry(&err) {
            warn!(attempt, "Not retrying: {}", err);
            return Err(RetryError::NotRetryable {
                attempts: attempt,
                last_error: err,
            });
        }

        if attempt >= max_attempts {
            warn!(attempts = attempt, "Retries exhausted: {}", err);
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last_error: err,
            });
        }

        let delay = policy.delay_for_attempt(attempt);
        warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Attempt failed, retrying: {}",
            err
        );

        tokio::select! {
            biased;
            _ = signal.cancelled() => {
                info!(attempt, "Retry cancelled during backoff");
                return Ok(None);
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(250));
    }

    #[test]
    fn test_exponential_delay_capped() {
        let policy =
            RetryPolicy::exponential(10, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(64), Duration::from_millis(500));
    }

    #[test]
    fn test_from_config() {
        let config = StreamConfig::default()
            .with_max_retries(5)
            .with_retry_delay(Duration::from_millis(20));
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.delay, Duration::from_millis(20));
        assert_eq!(policy.backoff, Backoff::Fixed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds_with_two_waits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
        let signal = CancellationToken::new();
        let started = Instant::now();

        let counter = Arc::clone(&calls);
        let result = with_retry(
            move |attempt| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        Err(format!("attempt {} failed", attempt))
                    } else {
                        Ok("session")
                    }
                }
            },
            &policy,
            &signal,
        )
        .await;

        assert_eq!(result.unwrap(), Some("session"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_last_error() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(10));
        let signal = CancellationToken::new();

        let result: Result<Option<()>, _> = with_retry(
            |attempt| async move { Err(format!("boom {}", attempt)) },
            &policy,
            &signal,
        )
        .await;

        match result {
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "boom 3");
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_one_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::fixed(0, Duration::from_secs(1));
        let signal = CancellationToken::new();

        let counter = Arc::clone(&calls);
        let result: Result<Option<()>, _> = with_retry(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("down") }
            },
            &policy,
            &signal,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_returns_none() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy::fixed(5, Duration::from_secs(30));
        let signal = CancellationToken::new();

        let counter = Arc::clone(&calls);
        let cancel = signal.clone();
        let result: Result<Option<()>, RetryError<&str>> = with_retry(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                cancel.cancel();
                async { Err("down") }
            },
            &policy,
            &signal,
        )
        .await;

        assert!(matches!(result, Ok(None)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pre_cancelled_skips_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let signal = CancellationToken::new();
        signal.cancel();

        let counter = Arc::clone(&calls);
        let result: Result<Option<()>, RetryError<&str>> = with_retry(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("unreachable") }
            },
            &RetryPolicy::default(),
            &signal,
        )
        .await;

        assert!(matches!(result, Ok(None)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_early() {
        let calls = Arc::new(AtomicUsize::new(0));
        let signal = CancellationToken::new();

        let counter = Arc::clone(&calls);
        let result: Result<Option<()>, _> = with_retry_if(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(404u16) }
            },
            &RetryPolicy::fixed(3, Duration::from_millis(1)),
            &signal,
            |status| *status >= 500,
        )
        .await;

        assert!(matches!(
            result,
            Err(RetryError::NotRetryable {
                attempts: 1,
                last_error: 404
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
