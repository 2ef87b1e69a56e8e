//! Retry policy implementation.

use crate::error::StoreError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Add jitter to backoff.
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the initial backoff duration.
    pub fn with_initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    /// Set the maximum backoff duration.
    pub fn with_max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Create a no-retry configuration.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Retry policy that executes operations with exponential backoff.
///
/// Only use with requests that are safe to repeat. A request whose
/// effect is not idempotent must be issued once without this policy.
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute an operation with retry logic.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempt = attempt, "Operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.config.max_retries {
                        if attempt > 0 {
                            warn!(
                                attempt = attempt,
                                max_retries = self.config.max_retries,
                                error = %error,
                                "Operation failed after all retries"
                            );
                        }
                        return Err(error);
                    }

                    let backoff = self.calculate_backoff(attempt);
                    debug!(
                        attempt = attempt,
                        backoff_ms = backoff.as_millis(),
                        error = %error,
                        "Retrying operation after backoff"
                    );

                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Calculate backoff duration for a given attempt.
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.config.initial_backoff.as_millis() as f64;
        let multiplied = base * self.config.backoff_multiplier.powi(attempt as i32);
        let capped = multiplied.min(self.config.max_backoff.as_millis() as f64);

        let final_ms = if self.config.use_jitter {
            // Equal jitter: half fixed, half random
            let jitter = rand::thread_rng().gen_range(0.0..1.0);
            capped * (0.5 + jitter * 0.5)
        } else {
            capped
        };

        Duration::from_millis(final_ms as u64)
    }

    /// Get the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .finish()
    }
}
