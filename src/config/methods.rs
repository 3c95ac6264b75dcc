//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use std::path::PathBuf;

use super::builder::ScanConfigBuilder;

impl<State> ScanConfigBuilder<State> {
    /// Cap on simultaneously open page contexts (default: 2)
    #[must_use]
    pub fn max_concurrent_contexts(mut self, max: usize) -> Self {
        self.config.max_concurrent_contexts = max;
        self
    }

    /// Context creation retries after the first attempt (default: 3)
    ///
    /// Attempt `n + 1` is preceded by a `n * retry_backoff_step_ms` delay; the
    /// first attempt is never delayed. `0` disables retrying.
    #[must_use]
    pub fn max_retry_attempts(mut self, retries: u32) -> Self {
        self.config.max_retry_attempts = retries;
        self
    }

    #[must_use]
    pub fn retry_backoff_step_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_step_ms = ms;
        self
    }

    #[must_use]
    pub fn slot_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.slot_poll_interval_ms = ms;
        self
    }

    /// Settle delays after load-complete, per page kind
    ///
    /// Course, quiz and review pages render parts of their content
    /// asynchronously after the load event, and there is no signal for
    /// when that finishes. These fixed delays stand in for one.
    #[must_use]
    pub fn settle_delays_ms(mut self, course: u64, quiz: u64, review: u64) -> Self {
        self.config.course_settle_ms = course;
        self.config.quiz_settle_ms = quiz;
        self.config.review_settle_ms = review;
        self
    }

    #[must_use]
    pub fn review_persist_settle_ms(mut self, ms: u64) -> Self {
        self.config.review_persist_settle_ms = ms;
        self
    }

    #[must_use]
    pub fn close_delay_ms(mut self, ms: u64) -> Self {
        self.config.close_delay_ms = ms;
        self
    }

    #[must_use]
    pub fn scan_pacing_ms(mut self, ms: u64) -> Self {
        self.config.scan_pacing_ms = ms;
        self
    }

    /// Timeout for the load-complete signal; `None` waits forever
    #[must_use]
    pub fn load_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.load_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn locale_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.locale_param = (name.into(), value.into());
        self
    }

    #[must_use]
    pub fn record_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.record_prefix = prefix.into();
        self
    }

    /// Replace the review keyword list for one locale
    ///
    /// # Example
    ///
    /// ```rust
    /// # use lms_autoscan::config::ScanConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let config = ScanConfig::builder()
    ///     .site_url("https://lms.example")
    ///     .review_keywords("kk", ["қарау"])
    ///     .build()?;
    /// assert!(config.review_keywords().contains_key("kk"));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn review_keywords<I, S>(mut self, locale: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .review_keywords
            .insert(locale.into(), words.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Reuse a Chrome profile directory so the LMS login survives restarts
    #[must_use]
    pub fn chrome_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.chrome_data_dir = dir;
        self
    }

    #[must_use]
    pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
        self.config.event_bus_capacity = capacity;
        self
    }
}
