//! Retry logic for outbound probes.
//!
//! Only transport failures (connection refused, timeouts) are retried. An HTTP
//! status is an answer, not a failure, and is handed back to the caller as-is.

use anyhow::{Result, anyhow};
use log::{debug, warn};

/// Maximum number of attempts for a single probe.
pub const MAX_RETRIES: usize = 3;

/// Delay between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 500;

/// Checks whether a failed request is worth another attempt.
pub fn is_retryable(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<reqwest::Error>() {
        Some(e) => e.is_timeout() || e.is_connect(),
        None => false,
    }
}

/// Executes an async operation, retrying transient transport errors.
pub async fn with_retry<F, Fut, T>(operation_name: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 1..=MAX_RETRIES {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_retryable(&e) {
                    debug!("{}: non-retryable error: {}", operation_name, e);
                    return Err(e);
                }

                if attempt < MAX_RETRIES {
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                        operation_name, attempt, MAX_RETRIES, e, RETRY_DELAY_MS
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(RETRY_DELAY_MS)).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| anyhow!("{}: failed after {} attempts", operation_name, MAX_RETRIES)))
}
