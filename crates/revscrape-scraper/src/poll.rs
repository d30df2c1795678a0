//! Bounded polling for upstream APIs that materialize results asynchronously.
//!
//! Task-based review APIs accept a job, then answer "not ready" for a while.
//! [`PollPolicy::poll`] asks at a fixed interval and gives up after either a
//! maximum number of attempts or a total time budget, returning
//! [`PollOutcome::Pending`] instead of waiting forever.

use std::future::Future;
use std::time::{Duration, Instant};

/// Fixed-interval polling limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub budget: Duration,
}

/// Result of a bounded poll.
#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Pending { attempts: u32, elapsed: Duration },
}

impl PollPolicy {
    #[must_use]
    pub fn new(interval: Duration, max_attempts: u32, budget: Duration) -> Self {
        Self {
            interval,
            max_attempts,
            budget,
        }
    }

    /// Calls `check` until it yields `Some`, an error, or the limits are hit.
    ///
    /// The first check happens immediately. Between checks the policy sleeps
    /// `interval`; it will not start a sleep that would end past `budget`.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `check`.
    pub async fn poll<T, E, F, Fut>(&self, mut check: F) -> Result<PollOutcome<T>, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            if let Some(value) = check(attempts).await? {
                return Ok(PollOutcome::Ready(value));
            }

            let elapsed = started.elapsed();
            if attempts >= self.max_attempts || elapsed + self.interval > self.budget {
                tracing::warn!(
                    attempts,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "upstream task not ready within poll budget"
                );
                return Ok(PollOutcome::Pending { attempts, elapsed });
            }

            tracing::debug!(attempts, "upstream task not ready; waiting");
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(Duration::ZERO, max_attempts, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn ready_on_first_check() {
        let outcome = policy(5)
            .poll(|_| async { Ok::<_, ()>(Some("done")) })
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::Ready("done"));
    }

    #[tokio::test]
    async fn ready_after_some_pending_checks() {
        let outcome = policy(5)
            .poll(|attempt| async move { Ok::<_, ()>((attempt == 3).then_some(attempt)) })
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::Ready(3));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mut calls = 0u32;
        let outcome = policy(4)
            .poll(|_| {
                calls += 1;
                async { Ok::<Option<()>, ()>(None) }
            })
            .await
            .unwrap();
        assert!(matches!(outcome, PollOutcome::Pending { attempts: 4, .. }));
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn gives_up_when_next_sleep_exceeds_budget() {
        let policy = PollPolicy::new(Duration::from_secs(10), 100, Duration::from_secs(5));
        let outcome = policy
            .poll(|_| async { Ok::<Option<()>, ()>(None) })
            .await
            .unwrap();
        assert!(matches!(outcome, PollOutcome::Pending { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn propagates_check_errors() {
        let result = policy(3)
            .poll(|_| async { Err::<Option<()>, &str>("boom") })
            .await;
        assert_eq!(result, Err("boom"));
    }
}
