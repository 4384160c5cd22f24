//! Bounded async retry
//! "Try, wait `interval`, try again" up to a fixed number of attempts,
//! shared by readiness probing and health monitoring

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Worst-case time spent waiting between attempts
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    Ready(T),
    /// Not there yet, try again after the interval
    NotYet(String),
    /// Stop retrying
    Abort(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetryError {
    #[error("gave up after {attempts} attempts{}", reason_suffix(.last))]
    Exhausted {
        attempts: u32,
        last: Option<String>,
    },

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("cancelled")]
    Cancelled,
}

fn reason_suffix(last: &Option<String>) -> String {
    last.as_ref()
        .map(|reason| format!(": {}", reason))
        .unwrap_or_default()
}

/// Run `op` until it is ready, aborts, runs out of attempts or `cancel` fires.
///
/// The first attempt runs immediately; `op` receives the 1-based attempt number.
pub async fn retry_with_interval<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut last = None;
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            outcome = op(attempt) => outcome,
        };

        match outcome {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Abort(reason) => return Err(RetryError::Aborted(reason)),
            Attempt::NotYet(reason) => last = Some(reason),
        }
    }

    Err(RetryError::Exhausted {
        attempts: policy.max_attempts,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_third_attempt() {
        let start = Instant::now();
        let result = retry_with_interval(
            RetryPolicy::new(5, Duration::from_secs(1)),
            &CancellationToken::new(),
            |attempt| async move {
                if attempt == 3 {
                    Attempt::Ready(attempt)
                } else {
                    Attempt::NotYet("connection refused".into())
                }
            },
        )
        .await;

        assert_eq!(result, Ok(3));
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_keeps_last_reason() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = retry_with_interval(
            RetryPolicy::new(4, Duration::from_millis(500)),
            &CancellationToken::new(),
            move |attempt| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Attempt::NotYet(format!("HTTP 503 on attempt {}", attempt)) }
            },
        )
        .await;

        assert_eq!(
            result,
            Err(RetryError::Exhausted {
                attempts: 4,
                last: Some("HTTP 503 on attempt 4".into())
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_abort_stops_immediately() {
        let result: Result<(), _> = retry_with_interval(
            RetryPolicy::new(10, Duration::from_secs(60)),
            &CancellationToken::new(),
            |_| async { Attempt::Abort("bad credentials".into()) },
        )
        .await;
        assert_eq!(result, Err(RetryError::Aborted("bad credentials".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_wait() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result: Result<(), _> = retry_with_interval(
            RetryPolicy::new(30, Duration::from_secs(1)),
            &cancel,
            |_| async { Attempt::NotYet("not yet".into()) },
        )
        .await;

        assert_eq!(result, Err(RetryError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_policy_budget() {
        let policy = RetryPolicy::new(30, Duration::from_secs(1));
        assert_eq!(policy.budget(), Duration::from_secs(29));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
