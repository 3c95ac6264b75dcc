//! Getter methods for `ScanConfig`

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use super::types::ScanConfig;
use crate::crawl_engine::TargetKind;

impl ScanConfig {
    #[must_use]
    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Parsed site URL
    pub fn site(&self) -> Result<Url> {
        Url::parse(&self.site_url).with_context(|| format!("Invalid site_url '{}'", self.site_url))
    }

    #[must_use]
    pub fn max_concurrent_contexts(&self) -> usize {
        self.max_concurrent_contexts
    }

    #[must_use]
    pub fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    #[must_use]
    pub fn retry_backoff_step(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_step_ms)
    }

    #[must_use]
    pub fn slot_poll_interval(&self) -> Duration {
        Duration::from_millis(self.slot_poll_interval_ms)
    }

    /// Settle delay applied after load-complete for a page of `kind`
    #[must_use]
    pub fn settle_delay(&self, kind: TargetKind) -> Duration {
        let ms = match kind {
            TargetKind::Course => self.course_settle_ms,
            TargetKind::Quiz => self.quiz_settle_ms,
            TargetKind::Review => self.review_settle_ms,
        };
        Duration::from_millis(ms)
    }

    #[must_use]
    pub fn review_persist_settle(&self) -> Duration {
        Duration::from_millis(self.review_persist_settle_ms)
    }

    #[must_use]
    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }

    #[must_use]
    pub fn scan_pacing(&self) -> Duration {
        Duration::from_millis(self.scan_pacing_ms)
    }

    #[must_use]
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn locale_param(&self) -> (&str, &str) {
        (&self.locale_param.0, &self.locale_param.1)
    }

    #[must_use]
    pub fn record_prefix(&self) -> &str {
        &self.record_prefix
    }

    #[must_use]
    pub fn review_keywords(&self) -> &BTreeMap<String, Vec<String>> {
        &self.review_keywords
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }

    #[must_use]
    pub fn event_bus_capacity(&self) -> usize {
        self.event_bus_capacity
    }
}
