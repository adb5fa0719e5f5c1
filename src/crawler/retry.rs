//! Bounded retry with exponential backoff

use crate::config::CrawlerConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Exponential backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub multiplier: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Wait after the `attempt`-th failure (1-based)
    ///
    /// `multiplier * 2^(attempt - 1)`, raised to `min` and capped at `max`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let raw = self.multiplier.saturating_mul(factor);
        raw.max(self.min).min(self.max)
    }

    /// No waiting at all
    pub fn none() -> Self {
        Self {
            multiplier: Duration::ZERO,
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }
}

/// Runs a fallible async operation up to `max_attempts` times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// `max_attempts` counts the first attempt; values below 1 are treated as 1
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.max_attempts,
            Backoff {
                multiplier: Duration::from_millis(config.backoff_multiplier_ms),
                min: Duration::from_millis(config.backoff_min_ms),
                max: Duration::from_millis(config.backoff_max_ms),
            },
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Retries while the error reports itself as [`Retryable`]
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.execute_if(operation, |e: &E| e.is_retryable()).await
    }

    /// Retries while `retryable` returns true for the error
    ///
    /// Returns the first success, the first non-retryable error, or the error
    /// of the last attempt once the budget is spent.
    pub async fn execute_if<T, E, F, Fut, P>(&self, mut operation: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts || !retryable(&e) => return Err(e),
                Err(e) => {
                    let delay = self.backoff.delay_for(attempt);
                    tracing::warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
