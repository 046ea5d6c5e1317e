//! Bounded retry for objects the backend materializes asynchronously.
//!
//! Built-in tools assigned to a freshly created agent, or the tool list of a
//! newly installed MCP server, appear some time after the parent exists.
//! Lookups for them go through [`retry_until_found`]; handlers never loop or
//! sleep on their own.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::context::OpContext;

/// Retry budget for one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Sleep after the first miss.
    pub initial_backoff: Duration,
    /// Upper bound for the doubled sleep.
    pub max_backoff: Duration,
    /// What is being waited for, used in logs and errors.
    pub description: String,
}

impl RetryConfig {
    /// Default budget: 20 attempts, 1 s initial backoff, 5 s cap.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            max_attempts: 20,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            description: description.into(),
        }
    }

    /// Override the number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override both backoff bounds.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }
}

/// Why a retry loop stopped without a value.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The host cancelled the operation.
    #[error("{0}: operation cancelled")]
    Cancelled(String),
    /// The operation itself failed; no further attempts were made.
    #[error(transparent)]
    Operation(E),
}

/// Run `operation` until it reports a value, fails, or the budget runs out.
///
/// The operation returns `Ok(Some(value))` when found, `Ok(None)` when not
/// yet visible, and `Err` to abort immediately. Exhausting the budget yields
/// `Ok(None)`; callers decide whether that is an error or a warning. No sleep
/// follows the last attempt.
pub async fn retry_until_found<T, E, F, Fut>(
    ctx: &OpContext,
    config: &RetryConfig,
    mut operation: F,
) -> Result<Option<T>, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let mut backoff = config.initial_backoff;

    for attempt in 1..=config.max_attempts {
        if ctx.is_cancelled() {
            return Err(RetryError::Cancelled(config.description.clone()));
        }

        match operation().await {
            Err(e) => return Err(RetryError::Operation(e)),
            Ok(Some(value)) => {
                debug!(description = %config.description, attempt, "Lookup succeeded");
                return Ok(Some(value));
            }
            Ok(None) => {}
        }

        if attempt == config.max_attempts {
            break;
        }

        debug!(
            description = %config.description,
            attempt,
            backoff_ms = backoff.as_millis() as u64,
            "Not found yet, retrying"
        );

        tokio::select! {
            _ = ctx.cancellation().cancelled() => {
                return Err(RetryError::Cancelled(config.description.clone()));
            }
            _ = tokio::time::sleep(backoff) => {}
        }

        backoff = (backoff * 2).min(config.max_backoff);
    }

    debug!(
        description = %config.description,
        attempts = config.max_attempts,
        "Lookup exhausted retry budget"
    );
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    #[test]
    fn test_default_config() {
        let config = RetryConfig::new("tool");
        assert_eq!(config.max_attempts, 20);
        assert_eq!(config.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.max_backoff, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_found_after_misses_with_doubling_backoff() {
        let ctx = OpContext::new();
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let counter = Arc::clone(&calls);
        let result: Result<Option<&str>, RetryError<String>> =
            retry_until_found(&ctx, &RetryConfig::new("tool"), || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(if n == 4 { Some("found") } else { None })
                }
            })
            .await;

        assert_eq!(result.unwrap(), Some("found"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 1s + 2s + 4s between the four attempts
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_capped_and_exhaustion_is_not_an_error() {
        let ctx = OpContext::new();
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        let config = RetryConfig::new("tool").with_max_attempts(5);

        let counter = Arc::clone(&calls);
        let result: Result<Option<()>, RetryError<String>> =
            retry_until_found(&ctx, &config, || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                }
            })
            .await;

        assert_eq!(result.unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // 1 + 2 + 4 + 5, and no sleep after the last attempt
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[test]
    fn test_error_aborts_immediately() {
        let ctx = OpContext::new();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<Option<()>, RetryError<String>> =
            tokio_test::block_on(retry_until_found(&ctx, &RetryConfig::new("tool"), || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err("boom".to_string())
                }
            }));

        assert!(matches!(result, Err(RetryError::Operation(ref e)) if e == "boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_sleep() {
        let ctx = Arc::new(OpContext::new());
        let cancel = ctx.cancellation().clone();

        let task_ctx = Arc::clone(&ctx);
        let handle = tokio::spawn(async move {
            retry_until_found::<(), String, _, _>(&task_ctx, &RetryConfig::new("tool"), || async {
                Ok(None)
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        cancel.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(RetryError::Cancelled(_))));
    }
}
