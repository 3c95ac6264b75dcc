//! Browser-side extraction helpers

use std::time::Duration;

use super::js_scripts::{READY_STATE_SCRIPT, SNAPSHOT_SCRIPT};
use super::schema::PageSnapshot;
use anyhow::{Context, Result};
use chromiumoxide::Page;

/// Capture the current DOM of `page` as a [`PageSnapshot`]
pub async fn capture_snapshot(page: &Page) -> Result<PageSnapshot> {
    let js_result = page
        .evaluate(SNAPSHOT_SCRIPT)
        .await
        .context("Failed to execute snapshot script")?;

    let snapshot: PageSnapshot = match js_result.into_value() {
        Ok(value) => {
            serde_json::from_value(value).context("Failed to parse snapshot from JS result")?
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to get snapshot value: {e}")),
    };

    Ok(snapshot)
}

/// Poll `document.readyState` until the page reports `complete`
///
/// `wait_for_navigation` only covers the HTTP response; LMS pages keep
/// running scripts after that. The caller bounds this with its own timeout.
pub async fn wait_for_ready_state(page: &Page) -> Result<()> {
    let poll_interval = Duration::from_millis(100);

    loop {
        match page.evaluate(READY_STATE_SCRIPT).await {
            Ok(result) => {
                if result.into_value::<bool>().unwrap_or(false) {
                    return Ok(());
                }
            }
            Err(e) => {
                log::debug!("Failed to check readyState: {e}, retrying");
            }
        }
        tokio::time::sleep(poll_interval).await;
    }
}
