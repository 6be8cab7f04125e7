//! Retry Wrapper
//!
//! Re-executes an asynchronous operation (build prompt -> call gateway ->
//! repair -> validate) on transient failure. Whether an error is retryable is
//! a typed property (`ForgeError::is_retryable`), checked here without any
//! string inspection: validation and malformed-output errors propagate
//! immediately because retrying a deterministic (temperature 0) operation
//! that is structurally wrong cannot succeed.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::constants::retry;
use crate::types::Result;

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded-attempt policy with exponential backoff and jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: usize,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Cap on the backoff delay
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt
    pub backoff_factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: retry::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(retry::BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry::MAX_DELAY_SECS),
            backoff_factor: retry::BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Policy with no sleeping, for tests
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }
}

// =============================================================================
// Retry Execution
// =============================================================================

/// Execute `operation`, re-attempting only retryable failures.
///
/// On exhaustion the last transient error propagates unchanged, so the
/// caller can still see it was tagged retryable ("the system tried and
/// failed" vs "this will never succeed").
pub async fn with_retry_policy<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut current_delay = policy.base_delay;

    for attempt in 1..=policy.max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => {
                debug!(
                    operation = operation_name,
                    category = %err.category(),
                    "Fatal error, not retrying"
                );
                return Err(err);
            }
            Err(err) if attempt == policy.max_attempts => {
                warn!(
                    operation = operation_name,
                    attempts = policy.max_attempts,
                    error = %err,
                    "Retries exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                // Honor a provider-suggested wait (rate limits) over backoff
                let delay = err
                    .recommended_delay()
                    .max(current_delay)
                    .min(policy.max_delay);
                let delay = delay + random_jitter(delay);

                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Transient failure, backing off"
                );
                sleep(delay).await;

                current_delay = calculate_backoff(
                    current_delay,
                    policy.backoff_factor,
                    policy.max_delay,
                );
            }
        }
    }

    unreachable!("retry loop always returns within max_attempts")
}

/// Generate random jitter using thread-local RNG
fn random_jitter(base_delay: Duration) -> Duration {
    let max_jitter_ms =
        (base_delay.as_millis() as f64 * retry::JITTER_FRACTION) as u64;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    let jitter_ms = rand::rng().random_range(0..max_jitter_ms);
    Duration::from_millis(jitter_ms)
}

/// Calculate exponential backoff with cap
fn calculate_backoff(current: Duration, factor: f32, max: Duration) -> Duration {
    let next = Duration::from_secs_f32(current.as_secs_f32() * factor);
    std::cmp::min(next, max)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorCategory, ForgeError, LlmError, Stage, ValidationError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn transient_error() -> ForgeError {
        LlmError::new(ErrorCategory::Transient, "overloaded")
            .retry_after(Duration::ZERO)
            .into()
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let calls = AtomicUsize::new(0);
        let result = with_retry_policy(&RetryPolicy::immediate(3), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ForgeError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_retried_exactly_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = with_retry_policy(&RetryPolicy::immediate(3), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient_error()) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // The final error is still tagged retryable
        let err = result.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_validation_error_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = with_retry_policy(&RetryPolicy::immediate(3), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ValidationError::new(Stage::Intent, "missing field 'category'").into())
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!result.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_output_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = with_retry_policy(&RetryPolicy::immediate(3), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ForgeError::malformed(Stage::Code, "no parse", "garbage")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_recovers_after_transient() {
        let calls = AtomicUsize::new(0);
        let result = with_retry_policy(&RetryPolicy::immediate(3), "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 1 {
                    Err(transient_error())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_capped() {
        let capped = calculate_backoff(
            Duration::from_secs(25),
            2.0,
            Duration::from_secs(30),
        );
        assert_eq!(capped, Duration::from_secs(30));
    }
}
