//! Seed page sources

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::Browser;
use tracing::{debug, warn};
use url::Url;

use super::SeedSource;
use crate::page_extractor::{PageSnapshot, capture_snapshot};
use crate::utils::is_same_site;

/// A fixed list of already-captured pages
#[derive(Debug, Clone, Default)]
pub struct StaticSeeds {
    pages: Vec<PageSnapshot>,
}

impl StaticSeeds {
    /// Keep only the snapshots that belong to `site`
    #[must_use]
    pub fn new(pages: Vec<PageSnapshot>, site: &Url) -> Self {
        let pages = pages
            .into_iter()
            .filter(|page| is_same_site(&page.url, site))
            .collect();
        Self { pages }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[async_trait]
impl SeedSource for StaticSeeds {
    async fn seed_pages(&self) -> Result<Vec<PageSnapshot>> {
        Ok(self.pages.clone())
    }
}

/// Tabs of the running browser that show a page of the site
///
/// Tabs the scanner opens itself are closed again before the next
/// `seed_pages` call, so only user tabs are picked up.
#[derive(Debug, Clone)]
pub struct BrowserTabSeeds {
    browser: Arc<Browser>,
    site: Url,
}

impl BrowserTabSeeds {
    #[must_use]
    pub fn new(browser: Arc<Browser>, site: Url) -> Self {
        Self { browser, site }
    }
}

#[async_trait]
impl SeedSource for BrowserTabSeeds {
    async fn seed_pages(&self) -> Result<Vec<PageSnapshot>> {
        let pages = self.browser.pages().await?;
        let mut seeds = Vec::new();

        for page in pages {
            let url = match page.url().await {
                Ok(Some(url)) => url,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to read tab URL: {}", e);
                    continue;
                }
            };
            if !is_same_site(&url, &self.site) {
                debug!("Ignoring tab outside the site: {}", url);
                continue;
            }
            match capture_snapshot(&page).await {
                Ok(snapshot) => seeds.push(snapshot),
                Err(e) => warn!("Failed to capture seed tab {}: {:#}", url, e),
            }
        }

        debug!("Found {} seed tabs for {}", seeds.len(), self.site);
        Ok(seeds)
    }
}
