//! Collaborator seams of the scan engine
//!
//! The engine never talks to a browser or a record store directly. It drives
//! these traits, which keeps every probe, retry and counter testable against
//! fixture pages.

pub mod chromium;
pub mod seeds;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::page_extractor::PageSnapshot;

pub use chromium::ChromiumBackend;
pub use seeds::{BrowserTabSeeds, StaticSeeds};

/// Opaque identifier of an isolated page context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextHandle(pub u64);

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Creates, observes and tears down isolated page contexts
///
/// A context is a background tab in the reference deployment. Handles are
/// only valid between `open_context` and `close_context`.
#[async_trait]
pub trait BrowsingBackend: Send + Sync {
    /// Create a context navigating to `url`
    async fn open_context(&self, url: &str) -> Result<ContextHandle>;

    /// Resolve once the context reports load-complete
    async fn wait_for_load(&self, handle: ContextHandle) -> Result<()>;

    /// Serialize the current page of the context
    async fn capture(&self, handle: ContextHandle) -> Result<PageSnapshot>;

    async fn close_context(&self, handle: ContextHandle) -> Result<()>;
}

/// Read-only view of the persisted answer records
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn count_records_with_prefix(&self, prefix: &str) -> Result<usize>;
}

/// Pages that are already open on the site when a session starts
///
/// Seeds are probed in place; no context is opened for them.
#[async_trait]
pub trait SeedSource: Send + Sync {
    async fn seed_pages(&self) -> Result<Vec<PageSnapshot>>;
}

#[async_trait]
impl<T: BrowsingBackend + ?Sized> BrowsingBackend for Arc<T> {
    async fn open_context(&self, url: &str) -> Result<ContextHandle> {
        (**self).open_context(url).await
    }

    async fn wait_for_load(&self, handle: ContextHandle) -> Result<()> {
        (**self).wait_for_load(handle).await
    }

    async fn capture(&self, handle: ContextHandle) -> Result<PageSnapshot> {
        (**self).capture(handle).await
    }

    async fn close_context(&self, handle: ContextHandle) -> Result<()> {
        (**self).close_context(handle).await
    }
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn count_records_with_prefix(&self, prefix: &str) -> Result<usize> {
        (**self).count_records_with_prefix(prefix).await
    }
}
