//! Bounded retry with exponential backoff
//!
//! Each pipeline stage owns a `RetryPolicy`. An operation is attempted at
//! most `max_attempts` times; between attempts the policy sleeps
//! `base_delay * 2^(attempt-1)` capped at `max_delay`, with ±25% jitter
//! when enabled. The loop returns a tagged outcome instead of a bare
//! error so the caller decides whether exhaustion degrades or fails.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::errors::RagError;

/// Retry parameters for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay_ms: u64,
    /// Delay cap
    pub max_delay_ms: u64,
    /// Randomise delays by ±25%
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8000,
            jitter: true,
        }
    }
}

/// Result of a retried operation
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// Operation succeeded on attempt `attempts`
    Success { value: T, attempts: u32 },
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u32, last_error: RagError },
    /// A non-retryable error stopped the loop
    Fatal { attempts: u32, error: RagError },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Fatal { attempts, .. } => *attempts,
        }
    }

    /// Collapse into a plain result, dropping the tag
    pub fn into_result(self) -> Result<T, RagError> {
        match self {
            RetryOutcome::Success { value, .. } => Ok(value),
            RetryOutcome::Exhausted { last_error, .. } => Err(last_error),
            RetryOutcome::Fatal { error, .. } => Err(error),
        }
    }
}

impl RetryPolicy {
    /// Policy with jitter disabled
    pub fn fixed(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            jitter: false,
        }
    }

    /// Policy that tries exactly once
    pub fn no_retry() -> Self {
        Self::fixed(1, 0, 0)
    }

    /// Run `operation`, retrying errors for which `RagError::is_retryable`
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RagError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => {
                    return RetryOutcome::Success {
                        value,
                        attempts: attempt,
                    }
                }
                Err(error) if !error.is_retryable() => {
                    return RetryOutcome::Fatal {
                        attempts: attempt,
                        error,
                    }
                }
                Err(error) => {
                    if attempt >= max_attempts {
                        return RetryOutcome::Exhausted {
                            attempts: attempt,
                            last_error: error,
                        };
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Delay after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let exponential = self.base_delay_ms.saturating_mul(1u64 << exponent);
        let delay_ms = exponential.min(self.max_delay_ms);

        let final_delay = if self.jitter && delay_ms > 0 {
            let spread = (delay_ms / 4) as f64;
            let offset = (rand::random::<f64>() * 2.0 - 1.0) * spread;
            (delay_ms as f64 + offset).max(0.0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }

    /// Upper bound on time spent sleeping between attempts (no jitter)
    pub fn max_total_wait(&self) -> Duration {
        let total: u64 = (1..self.max_attempts.max(1))
            .map(|attempt| {
                let exponent = (attempt - 1).min(31);
                self.base_delay_ms
                    .saturating_mul(1u64 << exponent)
                    .min(self.max_delay_ms)
            })
            .sum();
        Duration::from_millis(total)
    }
}
