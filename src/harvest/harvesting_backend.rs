//! Backend decorator that archives questions from every review page it captures

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::archive::AnswerArchive;
use super::questions::extract_questions;
use crate::backend::{BrowsingBackend, ContextHandle};
use crate::page_extractor::{PageSnapshot, analyze_review_page};

/// Wraps a [`BrowsingBackend`] and writes answer records as a side effect
///
/// Records land before `capture` returns, so the engine's before/after
/// record count around a visit sees them.
pub struct HarvestingBackend<B> {
    inner: B,
    archive: Arc<AnswerArchive>,
}

impl<B> HarvestingBackend<B> {
    pub fn new(inner: B, archive: Arc<AnswerArchive>) -> Self {
        Self { inner, archive }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: BrowsingBackend> BrowsingBackend for HarvestingBackend<B> {
    async fn open_context(&self, url: &str) -> Result<ContextHandle> {
        self.inner.open_context(url).await
    }

    async fn wait_for_load(&self, handle: ContextHandle) -> Result<()> {
        self.inner.wait_for_load(handle).await
    }

    async fn capture(&self, handle: ContextHandle) -> Result<PageSnapshot> {
        let snapshot = self.inner.capture(handle).await?;

        if analyze_review_page(&snapshot).is_valid_review_page {
            let questions = extract_questions(&snapshot);
            match self.archive.save_all(&questions).await {
                Ok(saved) => log::debug!(
                    target: "lms_autoscan::harvest",
                    "{saved}/{} new records from {}",
                    questions.len(),
                    snapshot.url
                ),
                // The visit itself is still good; the counter will show the gap
                Err(e) => log::warn!(
                    target: "lms_autoscan::harvest",
                    "Failed to archive questions from {}: {e:#}",
                    snapshot.url
                ),
            }
        }

        Ok(snapshot)
    }

    async fn close_context(&self, handle: ContextHandle) -> Result<()> {
        self.inner.close_context(handle).await
    }
}
