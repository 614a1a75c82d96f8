//! Retry with exponential backoff
//!
//! Reads and updates are retried on transient failures. Creates are not
//! idempotent and must never go through [`with_retry`].

use std::time::Duration;

use monsync_core::ports::{GatewayError, GatewayErrorKind};
use tracing::{info, warn};

/// How often and how patiently to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further attempt
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Single attempt only
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Determines whether an error is transient (retryable)
///
/// Gateway errors carry their own classification. Anything else falls back
/// to message inspection for network, throttling and 5xx symptoms.
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    if let Some(gateway) = GatewayError::find(err) {
        return gateway.kind == GatewayErrorKind::Transient;
    }

    let err_str = format!("{err:#}").to_lowercase();
    [
        "connection",
        "timed out",
        "timeout",
        "dns",
        "reset by peer",
        "broken pipe",
        "too many requests",
        "service unavailable",
        "bad gateway",
    ]
    .iter()
    .any(|needle| err_str.contains(needle))
}

/// Executes an async operation, retrying transient failures
///
/// Non-transient errors are returned immediately.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: &str, f: F) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < policy.max_retries && is_transient_error(&err) => {
                let delay = policy.base_delay * 2u32.saturating_pow(attempt);
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
