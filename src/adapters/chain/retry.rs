//! Bounded retry with exponential backoff for transient chain failures.
//!
//! Backoff doubles per attempt and is capped at a few seconds so that a
//! flapping endpoint slows operations down instead of stalling them.
//! Permanent failures (contract rejections, malformed responses) are
//! returned immediately.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::ChainError;
use crate::domain::models::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    /// Run `operation`, retrying transient `ChainError`s up to the
    /// configured attempt count.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ChainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "operation succeeded after retrying");
                    }
                    return Ok(result);
                }
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        error = %err,
                        backoff_ms = backoff.as_millis() as u64,
                        "transient RPC failure, retrying"
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// min(initial * 2^attempt, max)
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::new(5, 500, 5_000);

        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(500));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(1_000));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(2_000));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(4_000));
        // Capped
        assert_eq!(policy.calculate_backoff(4), Duration::from_millis(5_000));
        assert_eq!(policy.calculate_backoff(10), Duration::from_millis(5_000));
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let policy = RetryPolicy::new(3, 1, 10);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ChainError::Rpc("connection reset".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let policy = RetryPolicy::new(3, 1, 10);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ChainError::Endpoint("agent already exists".into()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_retries() {
        let policy = RetryPolicy::new(2, 1, 10);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ChainError::Rpc("timeout".into()))
                }
            })
            .await;

        assert!(result.is_err());
        // Initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
