//! Deduplicating store of discovered URLs, partitioned by kind

use std::collections::{HashMap, HashSet};

use super::crawl_types::{CrawlTarget, TargetKind};

/// Per-session set of discovered targets
///
/// Each URL is stored at most once per kind; iteration follows first
/// insertion, which is the order reviews get scanned in.
#[derive(Debug, Default, Clone)]
pub struct LinkRegistry {
    seen: HashMap<TargetKind, HashSet<String>>,
    ordered: HashMap<TargetKind, Vec<String>>,
}

impl LinkRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a URL; returns `false` if it was already known for this kind
    pub fn insert(&mut self, kind: TargetKind, url: impl Into<String>) -> bool {
        let url = url.into();
        if !self.seen.entry(kind).or_default().insert(url.clone()) {
            return false;
        }
        self.ordered.entry(kind).or_default().push(url);
        true
    }

    /// Insert every URL, returning the targets that were new
    pub fn extend<I>(&mut self, kind: TargetKind, urls: I) -> Vec<CrawlTarget>
    where
        I: IntoIterator<Item = String>,
    {
        urls.into_iter()
            .filter_map(|url| {
                self.insert(kind, url.clone())
                    .then(|| CrawlTarget::new(url, kind))
            })
            .collect()
    }

    #[must_use]
    pub fn contains(&self, kind: TargetKind, url: &str) -> bool {
        self.seen.get(&kind).is_some_and(|set| set.contains(url))
    }

    /// URLs of `kind` in insertion order
    #[must_use]
    pub fn urls(&self, kind: TargetKind) -> &[String] {
        self.ordered.get(&kind).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn targets(&self, kind: TargetKind) -> Vec<CrawlTarget> {
        self.urls(kind)
            .iter()
            .map(|url| CrawlTarget::new(url.clone(), kind))
            .collect()
    }

    #[must_use]
    pub fn len(&self, kind: TargetKind) -> usize {
        self.urls(kind).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.values().all(Vec::is_empty)
    }
}
