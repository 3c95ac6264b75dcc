//! Core types for the scan engine.
//!
//! This module contains the error taxonomy, crawl targets and the session
//! state machine states shared by every other part of the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Custom error type for scan operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    /// No open page on the site to start discovery from
    #[error("No seed pages found for the configured site")]
    NoSeedPages,

    /// Discovery finished without a single review link
    #[error("No results found: discovery produced no review pages")]
    NoResults,

    /// Every context creation attempt for a URL failed
    #[error("Failed to open a context for {url} after {attempts} attempts: {message}")]
    ContextCreation {
        url: String,
        attempts: u32,
        message: String,
    },

    /// The load-complete signal did not arrive in time
    #[error("Page {url} did not finish loading within {timeout:?}")]
    LoadTimeout { url: String, timeout: Duration },

    /// The page is not a review page or carries no questions
    #[error("Not a usable review page ({question_count} questions): {url}")]
    ReviewPageInvalid { url: String, question_count: usize },

    /// A probe could not run against the captured page
    #[error("Probe failed on {url}: {message}")]
    ProbeExecution { url: String, message: String },

    #[error("URL cannot be canonicalized: {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// `start()` was called while a session is active
    #[error("A scan session is already running")]
    AlreadyRunning,

    /// The scan was stopped before this operation began
    #[error("Scan operation was cancelled")]
    Cancelled,

    #[error("Context slot pool is closed")]
    SlotPoolClosed,

    /// Error reported by the browser or record store collaborator
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<anyhow::Error> for ScanError {
    fn from(err: anyhow::Error) -> Self {
        // Use {:#} to preserve full error chain with context
        Self::Backend(format!("{err:#}"))
    }
}

/// Convenience alias for Result with `ScanError`
pub type ScanResult<T> = Result<T, ScanError>;

/// Kind of page a discovered URL points to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Course,
    Quiz,
    Review,
}

impl TargetKind {
    pub const ALL: [Self; 3] = [Self::Course, Self::Quiz, Self::Review];
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Course => "course",
            Self::Quiz => "quiz",
            Self::Review => "review",
        };
        f.write_str(label)
    }
}

/// A URL to visit together with the kind of page it is expected to be
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrawlTarget {
    pub url: String,
    pub kind: TargetKind,
}

impl CrawlTarget {
    #[must_use]
    pub fn new(url: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }

    #[must_use]
    pub fn course(url: impl Into<String>) -> Self {
        Self::new(url, TargetKind::Course)
    }

    #[must_use]
    pub fn quiz(url: impl Into<String>) -> Self {
        Self::new(url, TargetKind::Quiz)
    }

    #[must_use]
    pub fn review(url: impl Into<String>) -> Self {
        Self::new(url, TargetKind::Review)
    }
}

/// Scan session state
///
/// `Idle → Discovering → Scanning → {Completed | Stopped | Failed}`;
/// `Discovering` may also go straight to `Stopped` or `Failed`. Terminal
/// states accept a new `start()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    #[default]
    Idle,
    Discovering,
    Scanning,
    Completed,
    Stopped,
    Failed,
}

impl ScanState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Failed)
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Discovering | Self::Scanning)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Scanning => "scanning",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_errors_keep_their_context_chain() {
        let err = anyhow::anyhow!("socket closed").context("Failed to open tab");
        let scan_err: ScanError = err.into();
        assert_eq!(
            scan_err.to_string(),
            "Backend error: Failed to open tab: socket closed"
        );
    }

    #[test]
    fn terminal_states() {
        assert!(!ScanState::Idle.is_terminal());
        assert!(ScanState::Scanning.is_active());
        for state in [ScanState::Completed, ScanState::Stopped, ScanState::Failed] {
            assert!(state.is_terminal());
            assert!(!state.is_active());
        }
    }
}
