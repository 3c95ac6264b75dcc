//! Event type definitions for the scan event system
//!
//! This module contains the events a running scan session broadcasts and the
//! user-facing log line type they carry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crawl_engine::{CrawlTarget, ScanCounters, ScanState};

/// Severity of a user-facing log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// One line of the session log
///
/// Append-only: entries are never edited once pushed to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub message: String,
    pub severity: Severity,
}

impl LogEntry {
    #[must_use]
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            message: message.into(),
            severity,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:>7}: {}",
            self.timestamp.format("%H:%M:%S"),
            self.severity,
            self.message
        )
    }
}

/// Event types emitted during a scan session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Emitted once per `start()` after the session has been reset
    SessionStarted {
        site_url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    StateChanged {
        from: ScanState,
        to: ScanState,
    },
    Log(LogEntry),
    /// Emitted after every counter mutation
    Counters(ScanCounters),
    /// A URL entered the link registry for the first time
    TargetDiscovered { target: CrawlTarget },
    /// Emitted when the session reaches a terminal state
    ///
    /// Subscribers can exit their event loops when receiving this event.
    SessionFinished {
        state: ScanState,
        counters: ScanCounters,
        duration: std::time::Duration,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ScanEvent {
    #[must_use]
    pub fn session_started(site_url: impl Into<String>) -> Self {
        Self::SessionStarted {
            site_url: site_url.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn session_finished(
        state: ScanState,
        counters: ScanCounters,
        duration: std::time::Duration,
    ) -> Self {
        Self::SessionFinished {
            state,
            counters,
            duration,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Check if this is the final event of a session
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SessionFinished { .. })
    }
}
