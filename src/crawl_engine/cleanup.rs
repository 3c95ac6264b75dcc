//! Browser shutdown after a session

use std::sync::Arc;

use anyhow::Result;
use chromiumoxide::Browser;
use log::{debug, warn};
use tokio::task::JoinHandle;

use crate::backend::ChromiumBackend;

/// Result of cleanup operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    Success,
    /// Some cleanup operations failed, with error details
    PartialFailure(Vec<String>),
}

/// Close leftover scanner tabs, then the browser itself
///
/// The browser is only closed if this is the last reference to it; tabs
/// belong to the user otherwise and stay open.
pub async fn shutdown_browser(
    backend: Arc<ChromiumBackend>,
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
) -> Result<CleanupResult> {
    let mut errors = Vec::new();

    backend.close_all().await;
    drop(backend);

    match Arc::try_unwrap(browser) {
        Ok(mut browser) => {
            debug!(target: "lms_autoscan::cleanup", "Closing browser");
            if let Err(e) = browser.close().await {
                warn!(target: "lms_autoscan::cleanup", "Failed to close browser: {e}");
                errors.push(format!("Browser close failed: {e}"));
            }

            // Wait for the process to exit (prevents "not closed manually" warning)
            if let Err(e) = browser.wait().await {
                warn!(target: "lms_autoscan::cleanup", "Failed to wait for browser exit: {e}");
                errors.push(format!("Browser wait failed: {e}"));
            }
        }
        Err(_) => {
            warn!(target: "lms_autoscan::cleanup", "Browser still shared, leaving it running");
            errors.push("Browser has outstanding references".to_string());
        }
    }

    handler.abort();

    if errors.is_empty() {
        Ok(CleanupResult::Success)
    } else {
        Ok(CleanupResult::PartialFailure(errors))
    }
}
