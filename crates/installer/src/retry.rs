//! Retry logic for package acquisition

use msdo_core::Error;
use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before each retry
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

/// Every attempt failed.
#[derive(Debug)]
pub struct RetryExhausted {
    /// Number of attempts made
    pub attempts: u32,
    /// Error from the final attempt
    pub last_error: Error,
}

/// Execute an operation with retry logic.
///
/// The operation receives the 1-based attempt number. Any error is retried
/// until `max_attempts` is reached.
///
/// # Errors
///
/// Returns [`RetryExhausted`] with the last error if all attempts fail
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = msdo_core::Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= max_attempts => {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                tracing::warn!(
                    "Operation failed (attempt {}/{}): {}. Retrying in {:?}",
                    attempt,
                    max_attempts,
                    e,
                    config.delay
                );

                if !config.delay.is_zero() {
                    tokio::time::sleep(config.delay).await;
                }
            }
        }
    }
}
