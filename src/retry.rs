//! Retry logic with exponential backoff
//!
//! This module provides configurable retry logic for transient fetch
//! failures. It implements exponential backoff with optional jitter to
//! prevent thundering herd against the remote search service.
//!
//! The loop is a bounded counted loop with an explicit attempt ceiling:
//! one initial try plus at most `max_attempts` retries, never unbounded.

use crate::config::RetryConfig;
use crate::error::FetchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, server-side errors)
/// should return `true`. Permanent failures (client errors such as 404)
/// should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            // Server-side and throttling statuses are worth retrying;
            // other statuses (4xx) are terminal for the page.
            FetchError::Status { status } => *status >= 500 || *status == 429,
            FetchError::Timeout { .. } => true,
            FetchError::Transport(_) => true,
            // A body that fails to parse is treated like any other flaky
            // response from the portal: retried within the budget.
            FetchError::InvalidBody(_) => true,
        }
    }
}

/// Execute an async fetch attempt with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, delays, backoff multiplier, jitter)
/// * `operation` - Async closure producing one attempt's `Result<T, E>`
///
/// # Returns
///
/// The successful result, or the last error after all retry attempts are
/// exhausted. The delay runs between attempts on the *same* request; callers
/// pace separate requests themselves.
pub async fn fetch_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "fetch succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "fetch attempt failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::time::sleep(jittered_delay).await;

                // Exponential backoff, capped at max_delay
                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "fetch failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "fetch failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
