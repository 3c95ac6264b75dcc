//! Type-safe builder for `ScanConfig` using the typestate pattern
//!
//! The site URL is the only required field; `build()` is not callable
//! until it has been provided.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use url::Url;

use super::types::ScanConfig;

// Type states for the builder
pub struct WithSiteUrl;

pub struct ScanConfigBuilder<State = ()> {
    pub(crate) config: ScanConfig,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ScanConfigBuilder<()> {
    fn default() -> Self {
        Self {
            config: ScanConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl ScanConfig {
    /// Create a builder for configuring a `ScanConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ScanConfigBuilder<()> {
        ScanConfigBuilder::default()
    }

    /// Re-open an existing (e.g. deserialized) config for overrides
    ///
    /// The result still goes through `build()` validation.
    #[must_use]
    pub fn builder_from(config: ScanConfig) -> ScanConfigBuilder<WithSiteUrl> {
        ScanConfigBuilder {
            config,
            _phantom: PhantomData,
        }
    }
}

impl ScanConfigBuilder<()> {
    pub fn site_url(mut self, url: impl Into<String>) -> ScanConfigBuilder<WithSiteUrl> {
        self.config.site_url = url.into();
        ScanConfigBuilder {
            config: self.config,
            _phantom: PhantomData,
        }
    }
}

impl ScanConfigBuilder<WithSiteUrl> {
    /// Replace the site URL of an already-seeded builder
    #[must_use]
    pub fn site_url(mut self, url: impl Into<String>) -> Self {
        self.config.site_url = url.into();
        self
    }

    pub fn build(self) -> Result<ScanConfig> {
        let mut config = self.config;

        // Normalize URL: add https:// if no scheme is present
        let raw = config.site_url.trim();
        if raw.is_empty() {
            return Err(anyhow!("site_url is required"));
        }
        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };
        let site = Url::parse(&with_scheme)
            .map_err(|e| anyhow!("Invalid site_url '{with_scheme}': {e}"))?;
        if site.host_str().is_none() {
            return Err(anyhow!("site_url '{with_scheme}' has no host"));
        }
        config.site_url = site.to_string();

        if config.max_concurrent_contexts == 0 {
            return Err(anyhow!("max_concurrent_contexts must be at least 1"));
        }
        if config.slot_poll_interval_ms == 0 {
            return Err(anyhow!("slot_poll_interval_ms must be positive"));
        }
        if config.record_prefix.is_empty() {
            return Err(anyhow!("record_prefix must not be empty"));
        }
        if config.locale_param.0.is_empty() {
            return Err(anyhow!("locale parameter name must not be empty"));
        }
        if config.event_bus_capacity == 0 {
            return Err(anyhow!("event_bus_capacity must be at least 1"));
        }

        // Keyword matching is case-insensitive against lowercased link text
        for words in config.review_keywords.values_mut() {
            words.retain(|w| !w.trim().is_empty());
            for word in words.iter_mut() {
                *word = word.trim().to_lowercase();
            }
        }
        config.review_keywords.retain(|_, words| !words.is_empty());
        if config.review_keywords.is_empty() {
            return Err(anyhow!("at least one review keyword is required"));
        }

        Ok(config)
    }
}
