//! `BrowsingBackend` over a live Chrome instance
//!
//! Every context is its own tab. Tabs are tracked by handle so the engine
//! never holds a `Page` itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::{BrowsingBackend, ContextHandle};
use crate::page_extractor::{PageSnapshot, capture_snapshot, wait_for_ready_state};

#[derive(Debug)]
pub struct ChromiumBackend {
    browser: Arc<Browser>,
    pages: DashMap<u64, Page>,
    next_id: AtomicU64,
}

impl ChromiumBackend {
    #[must_use]
    pub fn new(browser: Arc<Browser>) -> Self {
        Self {
            browser,
            pages: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn browser(&self) -> Arc<Browser> {
        Arc::clone(&self.browser)
    }

    /// Number of tabs opened by this backend that are still open
    #[must_use]
    pub fn open_tabs(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, handle: ContextHandle) -> Result<Page> {
        self.pages
            .get(&handle.0)
            .map(|entry| entry.value().clone())
            .with_context(|| format!("Unknown context {handle}"))
    }

    /// Close every tab still tracked, e.g. after an aborted session
    pub async fn close_all(&self) {
        let ids: Vec<u64> = self.pages.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Err(e) = self.close_context(ContextHandle(id)).await {
                warn!("Failed to close leftover tab {}: {}", id, e);
            }
        }
    }
}

#[async_trait]
impl BrowsingBackend for ChromiumBackend {
    async fn open_context(&self, url: &str) -> Result<ContextHandle> {
        let page = self
            .browser
            .new_page(url)
            .await
            .with_context(|| format!("Failed to open tab for {url}"))?;

        let handle = ContextHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.pages.insert(handle.0, page);
        debug!("Opened {} for {}", handle, url);
        Ok(handle)
    }

    async fn wait_for_load(&self, handle: ContextHandle) -> Result<()> {
        let page = self.page(handle)?;
        page.wait_for_navigation()
            .await
            .with_context(|| format!("Navigation failed in {handle}"))?;
        wait_for_ready_state(&page).await
    }

    async fn capture(&self, handle: ContextHandle) -> Result<PageSnapshot> {
        let page = self.page(handle)?;
        capture_snapshot(&page)
            .await
            .with_context(|| format!("Failed to capture {handle}"))
    }

    async fn close_context(&self, handle: ContextHandle) -> Result<()> {
        let Some((_, page)) = self.pages.remove(&handle.0) else {
            debug!("{} already closed", handle);
            return Ok(());
        };
        page.close()
            .await
            .with_context(|| format!("Failed to close {handle}"))?;
        info!("Closed {}", handle);
        Ok(())
    }
}
