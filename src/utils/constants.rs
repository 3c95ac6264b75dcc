//! Shared configuration constants for the auto-scan crawler
//!
//! Default values for the scan session. Every value here can be overridden
//! through [`ScanConfig`](crate::config::ScanConfig); these are the values the
//! reference LMS deployment was tuned against.

/// Maximum number of isolated page contexts open at once
///
/// Two keeps the LMS from throttling us and keeps the host browser responsive
/// while discovery branches overlap.
pub const DEFAULT_MAX_CONCURRENT_CONTEXTS: usize = 2;

/// Context creation retries after the first failed attempt
///
/// With the default backoff step the retries wait 1s, 2s and 3s.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;

/// Backoff step: retry `n` waits `n * step` before re-trying
pub const DEFAULT_RETRY_BACKOFF_STEP_MS: u64 = 1000;

/// Poll interval while all context slots are taken
pub const DEFAULT_SLOT_POLL_INTERVAL_MS: u64 = 1000;

/// Settle delay after a course page reports load complete
pub const DEFAULT_COURSE_SETTLE_MS: u64 = 3000;

/// Settle delay after a quiz page reports load complete
pub const DEFAULT_QUIZ_SETTLE_MS: u64 = 2000;

/// Settle delay after a review page reports load complete
pub const DEFAULT_REVIEW_SETTLE_MS: u64 = 5000;

/// Extra delay after review extraction so the record writer can finish
pub const DEFAULT_REVIEW_PERSIST_SETTLE_MS: u64 = 2000;

/// Delay between probe completion and context close
pub const DEFAULT_CLOSE_DELAY_MS: u64 = 500;

/// Pacing delay after every review page in the scanning phase
pub const DEFAULT_SCAN_PACING_MS: u64 = 1500;

/// Upper bound on waiting for a context's load-complete signal
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 30;

/// Query parameter forced onto every visited URL
pub const LOCALE_PARAM_NAME: &str = "lang";

/// Locale the LMS is pinned to, so link text and class heuristics stay stable
pub const LOCALE_PARAM_VALUE: &str = "ru";

/// Key prefix of persisted answer records
pub const ANSWER_RECORD_PREFIX: &str = "answer_";

/// Buffered events per subscriber before the slowest one starts lagging
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;

/// Chrome user agent string for launched browsers
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
