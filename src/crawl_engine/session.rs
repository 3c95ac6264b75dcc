//! Scan session state owned by the orchestrator

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::crawl_types::ScanState;
use crate::crawl_events::LogEntry;

/// Running counters of the scanning phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanCounters {
    /// Review pages visited
    pub scanned: usize,
    /// Questions seen across valid review pages
    pub found: usize,
    /// Answer records newly persisted
    pub saved: usize,
    /// 0.0 ..= 100.0
    pub progress_percent: f64,
}

/// State of the current (or last) scan session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSession {
    pub state: ScanState,
    pub counters: ScanCounters,
    pub log: Vec<LogEntry>,
}

impl ScanSession {
    /// Fresh session in `Discovering`, as `start()` leaves it
    #[must_use]
    pub fn discovering() -> Self {
        Self {
            state: ScanState::Discovering,
            ..Self::default()
        }
    }
}

/// What a finished `start()` returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub state: ScanState,
    pub counters: ScanCounters,
    pub courses: usize,
    pub quizzes: usize,
    pub reviews: usize,
    pub duration: Duration,
}
