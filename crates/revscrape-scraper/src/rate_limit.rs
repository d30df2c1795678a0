//! Retry utilities for upstream HTTP requests.
//!
//! Provides exponential backoff retry logic for transient HTTP errors such as
//! 429 Rate Limited responses or a flaky 5xx from a review API. Non-retriable
//! errors (parse failures, 404s, API-level errors) are propagated immediately.
//!
//! This is per-request hardening inside an adapter. The collector's own
//! inter-page delay is a separate flat sleep.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`ScraperError::RateLimited`]: HTTP 429; the server has asked us to back off.
/// - [`ScraperError::Http`]: network-level failure (connection reset, timeout, etc.).
/// - [`ScraperError::UnexpectedStatus`] with a 5xx status.
///
/// Everything else is a property of the request or the payload and would fail
/// the same way again.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        _ => false,
    }
}

/// Sleep before retry number `attempt + 1`: `backoff_base_secs * 2^attempt`
/// seconds, capped at 60 s, then scaled by `jitter`.
fn backoff_delay(backoff_base_secs: u64, attempt: u32, jitter: f64) -> Duration {
    let capped = backoff_base_secs
        .saturating_mul(1000)
        .saturating_mul(1u64 << attempt.min(10))
        .min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let millis = (capped as f64 * jitter) as u64;
    Duration::from_millis(millis)
}

/// Runs `operation`, retrying transient failures with jittered exponential
/// backoff (see [`backoff_delay`]).
///
/// At most `max_retries` retries follow the first try; after that the last
/// error is returned. Non-retriable errors return immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay = backoff_delay(backoff_base_secs, attempt, rand::random::<f64>() * 0.5 + 0.75);
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient upstream error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
