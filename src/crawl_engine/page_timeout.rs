//! Timeout utilities for page operations
//!
//! Bounds the load-complete wait so a tab that never fires its load event
//! fails that one target instead of hanging the session.

use std::future::Future;
use std::time::Duration;

use super::crawl_types::{ScanError, ScanResult};

/// Wrap a load wait with an optional timeout
///
/// # Arguments
/// * `operation` - The load-complete future
/// * `timeout` - `None` waits indefinitely
/// * `url` - Page being loaded, for the error message
///
/// # Returns
/// * `Ok(())` - The page reported load-complete
/// * `Err(ScanError::LoadTimeout)` - The timeout elapsed first
/// * `Err(ScanError::Backend)` - The backend reported a failure
pub async fn with_load_timeout<F>(operation: F, timeout: Option<Duration>, url: &str) -> ScanResult<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    let Some(limit) = timeout else {
        return operation.await.map_err(ScanError::from);
    };

    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result.map_err(ScanError::from),
        Err(_) => Err(ScanError::LoadTimeout {
            url: url.to_string(),
            timeout: limit,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_wait_maps_to_load_timeout() {
        let never = std::future::pending::<anyhow::Result<()>>();
        let result = with_load_timeout(never, Some(Duration::from_secs(30)), "https://lms.example/").await;
        assert!(matches!(
            result,
            Err(ScanError::LoadTimeout { timeout, .. }) if timeout == Duration::from_secs(30)
        ));
    }

    #[tokio::test]
    async fn backend_failure_passes_through() {
        let failing = async { Err(anyhow::anyhow!("tab crashed")) };
        let result = with_load_timeout(failing, None, "https://lms.example/").await;
        assert!(matches!(result, Err(ScanError::Backend(msg)) if msg.contains("tab crashed")));
    }
}
