use std::{future::Future, pin::Pin, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use tokio::time::sleep;

use crate::{NetworkError, Result, RetryPolicy};

/// Lower bound applied to every computed retry delay.
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Upper bound applied to every computed retry delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Smallest multiplicative jitter factor.
pub const JITTER_MIN: f64 = 0.8;
/// Largest multiplicative jitter factor.
pub const JITTER_MAX: f64 = 1.2;

/// Future produced by a single attempt.
pub type AttemptFuture<'a> = Pin<Box<dyn Future<Output = Result<Bytes>> + Send + 'a>>;

/// Runs one operation repeatedly until it succeeds or the policy gives up.
#[async_trait]
pub trait RetryHandler: Send + Sync {
    /// Invokes `operation` (one attempt per call) under `policy`.
    ///
    /// Errors for which [`NetworkError::is_retryable`] is false must be
    /// returned without another attempt.
    async fn retry<'a>(
        &self,
        policy: &RetryPolicy,
        operation: &(dyn Fn() -> AttemptFuture<'a> + Send + Sync),
    ) -> Result<Bytes>;

    /// Whether a failed attempt may be retried. Every error is by default.
    fn should_retry(&self, _error: &NetworkError) -> bool {
        true
    }
}

/// Exponential backoff with multiplicative jitter.
///
/// Makes up to `max_retries + 1` attempts. After failed attempt `i` it waits
/// `clamp(base_delay * backoff_multiplier^i * U(0.8, 1.2), 100ms, 5s)`.
/// The wait is a plain `tokio` sleep, so dropping the returned future cancels
/// it immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct BackoffRetryHandler;

impl BackoffRetryHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RetryHandler for BackoffRetryHandler {
    async fn retry<'a>(
        &self,
        policy: &RetryPolicy,
        operation: &(dyn Fn() -> AttemptFuture<'a> + Send + Sync),
    ) -> Result<Bytes> {
        let attempts = policy.max_attempts();
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = backoff_delay(policy, attempt - 1, jitter_factor());

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request after backoff"
                );

                sleep(delay).await;
            }

            match operation().await {
                Ok(data) => return Ok(data),
                Err(err) if !err.is_retryable() || !self.should_retry(&err) => return Err(err),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, error = %err, "request attempt failed");

                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(NetworkError::Unknown))
    }
}

/// Makes exactly one attempt regardless of the policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetry;

#[async_trait]
impl RetryHandler for NoRetry {
    async fn retry<'a>(
        &self,
        _policy: &RetryPolicy,
        operation: &(dyn Fn() -> AttemptFuture<'a> + Send + Sync),
    ) -> Result<Bytes> {
        operation().await
    }

    fn should_retry(&self, _error: &NetworkError) -> bool {
        false
    }
}

/// Delay before the retry that follows failed attempt `attempt_index`.
///
/// `jitter` is the multiplicative factor, normally drawn from
/// `JITTER_MIN..=JITTER_MAX`.
pub fn backoff_delay(policy: &RetryPolicy, attempt_index: usize, jitter: f64) -> Duration {
    let multiplier = policy.backoff_multiplier.max(1.0);
    let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
    let exponential = policy.base_delay.as_secs_f64() * multiplier.powi(exponent);
    let raw = exponential * jitter;

    if !raw.is_finite() {
        return MAX_RETRY_DELAY;
    }
    Duration::from_secs_f64(raw.clamp(MIN_RETRY_DELAY.as_secs_f64(), MAX_RETRY_DELAY.as_secs_f64()))
}

fn jitter_factor() -> f64 {
    rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX)
}
