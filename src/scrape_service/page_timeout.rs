//! Timeout wrapper for page operations

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

/// Run `operation` with an explicit deadline
///
/// On expiry the error wraps `tokio::time::error::Elapsed`, so callers can
/// tell a timeout apart from the operation failing on its own.
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout: Duration,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(elapsed) => Err(anyhow::Error::new(elapsed)
            .context(format!("{operation_name} timeout after {timeout:?}"))),
    }
}
