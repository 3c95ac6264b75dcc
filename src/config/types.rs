//! Core configuration types for an auto-scan session
//!
//! This module contains the main `ScanConfig` struct that defines site
//! patterns, concurrency limits, retry policy and page settle timings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::utils::{
    ANSWER_RECORD_PREFIX, DEFAULT_CLOSE_DELAY_MS, DEFAULT_COURSE_SETTLE_MS,
    DEFAULT_EVENT_BUS_CAPACITY, DEFAULT_LOAD_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_CONTEXTS,
    DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_QUIZ_SETTLE_MS, DEFAULT_RETRY_BACKOFF_STEP_MS,
    DEFAULT_REVIEW_PERSIST_SETTLE_MS, DEFAULT_REVIEW_SETTLE_MS, DEFAULT_SCAN_PACING_MS,
    DEFAULT_SLOT_POLL_INTERVAL_MS, LOCALE_PARAM_NAME, LOCALE_PARAM_VALUE,
};

/// Main configuration struct for an auto-scan session
///
/// Build one through [`ScanConfig::builder`]; deserializing from JSON is also
/// supported, in which case every field except `site_url` falls back to its
/// default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Base URL of the LMS. Seed pages on other hosts are ignored.
    ///
    /// **INVARIANT:** Always an absolute http(s) URL (validated in builder).
    pub(crate) site_url: String,

    /// Ceiling on simultaneously open page contexts
    pub(crate) max_concurrent_contexts: usize,

    /// Context creation retries after the first attempt
    pub(crate) max_retry_attempts: u32,

    /// Retry `n` waits `n * retry_backoff_step_ms`
    pub(crate) retry_backoff_step_ms: u64,

    /// How often a saturated slot pool re-checks for a free slot
    pub(crate) slot_poll_interval_ms: u64,

    pub(crate) course_settle_ms: u64,
    pub(crate) quiz_settle_ms: u64,
    pub(crate) review_settle_ms: u64,

    /// Extra wait after review extraction for the record writer
    pub(crate) review_persist_settle_ms: u64,

    /// Wait between probe completion and context close
    pub(crate) close_delay_ms: u64,

    /// Pause after every review page during scanning
    pub(crate) scan_pacing_ms: u64,

    /// Timeout for the load-complete signal
    ///
    /// `None` waits indefinitely.
    ///
    /// Default: 30 seconds
    pub(crate) load_timeout_secs: Option<u64>,

    /// Query parameter name and value forced onto every visited URL
    pub(crate) locale_param: (String, String),

    /// Key prefix of persisted answer records
    pub(crate) record_prefix: String,

    /// Locale → visible link texts that mark a "review attempt" anchor
    ///
    /// Used by the fallback review-link search on quiz pages whose theme
    /// does not render an attempt-history table.
    pub(crate) review_keywords: BTreeMap<String, Vec<String>>,

    pub(crate) headless: bool,

    /// Chrome user data directory. When unset a throwaway profile is created,
    /// which means the user has to log in again for every run.
    pub(crate) chrome_data_dir: Option<PathBuf>,

    /// Buffered events per progress subscriber
    pub(crate) event_bus_capacity: usize,
}

/// Keyword lists shipped for the two locales the LMS renders in
#[must_use]
pub fn default_review_keywords() -> BTreeMap<String, Vec<String>> {
    let mut keywords = BTreeMap::new();
    keywords.insert(
        "ru".to_string(),
        vec!["просмотр".to_string(), "обзор".to_string()],
    );
    keywords.insert("en".to_string(), vec!["review".to_string()]);
    keywords
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            max_concurrent_contexts: DEFAULT_MAX_CONCURRENT_CONTEXTS,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_backoff_step_ms: DEFAULT_RETRY_BACKOFF_STEP_MS,
            slot_poll_interval_ms: DEFAULT_SLOT_POLL_INTERVAL_MS,
            course_settle_ms: DEFAULT_COURSE_SETTLE_MS,
            quiz_settle_ms: DEFAULT_QUIZ_SETTLE_MS,
            review_settle_ms: DEFAULT_REVIEW_SETTLE_MS,
            review_persist_settle_ms: DEFAULT_REVIEW_PERSIST_SETTLE_MS,
            close_delay_ms: DEFAULT_CLOSE_DELAY_MS,
            scan_pacing_ms: DEFAULT_SCAN_PACING_MS,
            load_timeout_secs: Some(DEFAULT_LOAD_TIMEOUT_SECS),
            locale_param: (LOCALE_PARAM_NAME.to_string(), LOCALE_PARAM_VALUE.to_string()),
            record_prefix: ANSWER_RECORD_PREFIX.to_string(),
            review_keywords: default_review_keywords(),
            headless: false,
            chrome_data_dir: None,
            event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
        }
    }
}
