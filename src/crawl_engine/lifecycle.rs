//! Context lifecycle: open, load, settle, probe, close
//!
//! Every visit goes through [`ContextLifecycleManager::with_page`]. The slot
//! and the context are released on every exit path: explicitly on the normal
//! path, and from a `Drop` fallback if the visit future is dropped midway.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};

use super::crawl_types::{CrawlTarget, ScanError, ScanResult, TargetKind};
use super::page_timeout::with_load_timeout;
use crate::backend::{BrowsingBackend, ContextHandle};
use crate::config::ScanConfig;
use crate::page_extractor::PageSnapshot;
use crate::slot_pool::{SlotGuard, SlotPool};
use crate::utils::canonicalize_url;

pub struct ContextLifecycleManager {
    backend: Arc<dyn BrowsingBackend>,
    slots: Arc<SlotPool>,
    config: Arc<ScanConfig>,
    /// Cleared by `stop()`; checked before every new context
    active: Arc<AtomicBool>,
}

impl ContextLifecycleManager {
    #[must_use]
    pub fn new(
        backend: Arc<dyn BrowsingBackend>,
        slots: Arc<SlotPool>,
        config: Arc<ScanConfig>,
        active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            backend,
            slots,
            config,
            active,
        }
    }

    #[must_use]
    pub fn slots(&self) -> &Arc<SlotPool> {
        &self.slots
    }

    fn ensure_active(&self) -> ScanResult<()> {
        if self.active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ScanError::Cancelled)
        }
    }

    /// Visit `target` in a fresh context and run `probe` on the loaded page
    ///
    /// # Errors
    /// * `Cancelled` - the session was stopped before a context was opened
    /// * `ContextCreation` - every creation attempt failed
    /// * `LoadTimeout` - the page never reported load-complete
    /// * whatever `probe` returns
    pub async fn with_page<T, F>(&self, target: &CrawlTarget, probe: F) -> ScanResult<T>
    where
        F: FnOnce(&PageSnapshot) -> ScanResult<T> + Send,
        T: Send,
    {
        self.ensure_active()?;
        let slot = self.slots.acquire().await?;
        // The wait for a slot can be long; re-check before opening
        self.ensure_active()?;

        let (name, value) = self.config.locale_param();
        let url = canonicalize_url(&target.url, name, value).map_err(|e| ScanError::InvalidUrl {
            url: target.url.clone(),
            message: format!("{e:#}"),
        })?;

        let handle = self.open_with_retry(&url).await?;
        let mut context = OpenContext::new(Arc::clone(&self.backend), handle, slot);
        debug!(target: "lms_autoscan::lifecycle", "Opened {handle} for {} {url}", target.kind);

        let result = self.visit(handle, target.kind, &url, probe).await;

        tokio::time::sleep(self.config.close_delay()).await;
        context.close().await;
        result
    }

    async fn visit<T, F>(
        &self,
        handle: ContextHandle,
        kind: TargetKind,
        url: &str,
        probe: F,
    ) -> ScanResult<T>
    where
        F: FnOnce(&PageSnapshot) -> ScanResult<T> + Send,
    {
        with_load_timeout(
            self.backend.wait_for_load(handle),
            self.config.load_timeout(),
            url,
        )
        .await?;

        tokio::time::sleep(self.config.settle_delay(kind)).await;

        let snapshot = self.backend.capture(handle).await?;
        let result = probe(&snapshot);

        if kind == TargetKind::Review {
            // Give the record writer time to persist what it saw on this page
            tokio::time::sleep(self.config.review_persist_settle()).await;
        }
        result
    }

    /// Create a context, retrying with linear backoff
    ///
    /// One initial attempt plus `max_retry_attempts` retries; attempt `n + 1`
    /// waits `n * retry_backoff_step` first. The returned handle is always the
    /// one from the successful attempt.
    async fn open_with_retry(&self, url: &str) -> ScanResult<ContextHandle> {
        let attempts = self.config.max_retry_attempts().saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.config.retry_backoff_step() * (attempt - 1)).await;
                self.ensure_active()?;
            }

            match self.backend.open_context(url).await {
                Ok(handle) => return Ok(handle),
                Err(e) => {
                    warn!(
                        target: "lms_autoscan::lifecycle",
                        "Context creation attempt {attempt}/{attempts} for {url} failed: {e:#}"
                    );
                    last_error = format!("{e:#}");
                }
            }
        }

        Err(ScanError::ContextCreation {
            url: url.to_string(),
            attempts,
            message: last_error,
        })
    }
}

/// An open context together with the slot it occupies
struct OpenContext {
    backend: Arc<dyn BrowsingBackend>,
    handle: ContextHandle,
    slot: Option<SlotGuard>,
    closed: bool,
}

impl OpenContext {
    fn new(backend: Arc<dyn BrowsingBackend>, handle: ContextHandle, slot: SlotGuard) -> Self {
        Self {
            backend,
            handle,
            slot: Some(slot),
            closed: false,
        }
    }

    /// Close the context, then free the slot
    ///
    /// A failed close is logged, never propagated: the visit result wins.
    async fn close(&mut self) {
        if let Err(e) = self.backend.close_context(self.handle).await {
            warn!(target: "lms_autoscan::lifecycle", "Failed to close {}: {e:#}", self.handle);
        }
        self.closed = true;
        self.slot.take();
    }
}

impl Drop for OpenContext {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let backend = Arc::clone(&self.backend);
        let handle = self.handle;
        let slot = self.slot.take();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = backend.close_context(handle).await {
                        warn!(target: "lms_autoscan::lifecycle", "Deferred close of {handle} failed: {e:#}");
                    }
                    drop(slot);
                });
            }
            Err(_) => {
                warn!(target: "lms_autoscan::lifecycle", "No runtime to close {handle}; releasing its slot only");
                drop(slot);
            }
        }
    }
}
