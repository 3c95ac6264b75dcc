//! Scan orchestration
//!
//! [`AutoScanner`] owns the whole session: seed lookup, discovery, the
//! sequential review scan with its counters, and the state machine that
//! `start()`/`stop()` drive. Nothing here is global; a second scanner is a
//! second independent session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use super::crawl_types::{CrawlTarget, ScanError, ScanResult, ScanState, TargetKind};
use super::discovery::DiscoveryEngine;
use super::lifecycle::ContextLifecycleManager;
use super::progress::ProgressReporter;
use super::registry::LinkRegistry;
use super::session::{ScanSession, ScanSummary};
use crate::backend::{BrowsingBackend, RecordStore, SeedSource};
use crate::config::ScanConfig;
use crate::crawl_events::{ScanEvent, ScanEventBus};
use crate::page_extractor::{ReviewExtraction, ReviewKeywords, analyze_review_page};
use crate::slot_pool::SlotPool;

pub struct AutoScanner {
    config: Arc<ScanConfig>,
    backend: Arc<dyn BrowsingBackend>,
    records: Arc<dyn RecordStore>,
    seeds: Arc<dyn SeedSource>,
    session: Arc<RwLock<ScanSession>>,
    bus: ScanEventBus,
    slots: Arc<SlotPool>,
    /// Cooperative cancellation flag, cleared by `stop()`
    scanning: Arc<AtomicBool>,
    /// Set for the duration of a `start()` call
    running: AtomicBool,
    /// Registry of the current (or last) session
    registry: Arc<Mutex<LinkRegistry>>,
}

impl AutoScanner {
    #[must_use]
    pub fn new(
        config: ScanConfig,
        backend: Arc<dyn BrowsingBackend>,
        records: Arc<dyn RecordStore>,
        seeds: Arc<dyn SeedSource>,
    ) -> Self {
        let slots = Arc::new(SlotPool::new(
            config.max_concurrent_contexts(),
            config.slot_poll_interval(),
        ));
        let bus = ScanEventBus::new(config.event_bus_capacity());
        Self {
            config: Arc::new(config),
            backend,
            records,
            seeds,
            session: Arc::new(RwLock::new(ScanSession::default())),
            bus,
            slots,
            scanning: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
            registry: Arc::new(Mutex::new(LinkRegistry::new())),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.bus.subscribe()
    }

    #[must_use]
    pub fn event_bus(&self) -> &ScanEventBus {
        &self.bus
    }

    /// Snapshot of the current session
    #[must_use]
    pub fn session(&self) -> ScanSession {
        self.session.read().clone()
    }

    #[must_use]
    pub fn state(&self) -> ScanState {
        self.session.read().state
    }

    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn slots(&self) -> &SlotPool {
        &self.slots
    }

    /// Targets discovered by the current (or last) session
    #[must_use]
    pub fn discovered(&self, kind: TargetKind) -> Vec<CrawlTarget> {
        self.registry.lock().targets(kind)
    }

    /// Request cancellation
    ///
    /// Checked before every new context and at the top of every scan
    /// iteration; contexts already open finish their cleanup first.
    pub fn stop(&self) {
        if self.scanning.swap(false, Ordering::SeqCst) {
            self.progress().info("Stop requested, finishing the current page");
        }
    }

    fn progress(&self) -> ProgressReporter {
        ProgressReporter::new(Arc::clone(&self.session), self.bus.clone())
    }

    /// Run one full session: discovery, then the review scan
    ///
    /// Resolves once the session reached a terminal state. A stopped
    /// session is `Ok` with `state == Stopped`.
    ///
    /// # Errors
    /// * `AlreadyRunning` - another `start()` has not returned yet
    /// * `NoSeedPages` - no open page of the site to start from
    /// * `NoResults` - discovery found no review pages
    /// * `Backend` - the seed source failed
    pub async fn start(&self) -> ScanResult<ScanSummary> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ScanError::AlreadyRunning);
        }
        let _running = RunGuard {
            running: &self.running,
            scanning: &self.scanning,
        };

        *self.session.write() = ScanSession::default();
        *self.registry.lock() = LinkRegistry::new();
        self.scanning.store(true, Ordering::SeqCst);

        let progress = self.progress();
        let started = Instant::now();
        progress.started(self.config.site_url());
        progress.set_state(ScanState::Discovering);
        progress.info(format!("Auto-scan started for {}", self.config.site_url()));

        let seeds = match self.seeds.seed_pages().await {
            Ok(seeds) => seeds,
            Err(e) => {
                let err = ScanError::from(e);
                progress.error(format!("Could not list open pages: {err}"));
                return Err(self.fail(&progress, started, err));
            }
        };
        if seeds.is_empty() {
            progress.error("No open pages of the site found; open the LMS and log in first");
            return Err(self.fail(&progress, started, ScanError::NoSeedPages));
        }
        progress.info(format!("Starting discovery from {} open pages", seeds.len()));

        let lifecycle = ContextLifecycleManager::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.slots),
            Arc::clone(&self.config),
            Arc::clone(&self.scanning),
        );
        let discovery = DiscoveryEngine::new(
            &lifecycle,
            Arc::clone(&self.registry),
            progress.clone(),
            ReviewKeywords::from_map(self.config.review_keywords()),
            self.config.locale_param().0,
        );
        discovery.discover(&seeds).await;

        if !self.is_scanning() {
            return Ok(self.finish(&progress, started, ScanState::Stopped));
        }

        let reviews = self.registry.lock().targets(TargetKind::Review);
        if reviews.is_empty() {
            progress.error("No results found: no attempted quizzes with review pages");
            return Err(self.fail(&progress, started, ScanError::NoResults));
        }

        progress.set_state(ScanState::Scanning);
        progress.info(format!("Found {} review pages, scanning", reviews.len()));

        let stopped = self.scan_reviews(&lifecycle, &progress, &reviews).await;
        if stopped {
            return Ok(self.finish(&progress, started, ScanState::Stopped));
        }

        match self.count_records().await {
            Some(total) => {
                progress.update_counters(|c| c.saved = total);
            }
            None => progress.warning("Could not re-read the record count; keeping the running total"),
        }
        let counters = progress.counters();
        progress.success(format!(
            "Scan complete: {} pages, {} questions, {} saved",
            counters.scanned, counters.found, counters.saved
        ));
        Ok(self.finish(&progress, started, ScanState::Completed))
    }

    /// Visit each review page once, in registry order
    ///
    /// Returns `true` if the loop ended because of `stop()`.
    async fn scan_reviews(
        &self,
        lifecycle: &ContextLifecycleManager,
        progress: &ProgressReporter,
        reviews: &[CrawlTarget],
    ) -> bool {
        let total = reviews.len();

        for (index, target) in reviews.iter().enumerate() {
            if !self.is_scanning() {
                return true;
            }

            let before = self.count_records().await;
            let result = lifecycle
                .with_page(target, |page| validate_review(page.url.as_str(), analyze_review_page(page)))
                .await;
            let percent = (index + 1) as f64 / total as f64 * 100.0;

            match result {
                Ok(extraction) => {
                    let after = self.count_records().await;
                    let delta = match (before, after) {
                        (Some(before), Some(after)) => after.saturating_sub(before),
                        _ => 0,
                    };
                    progress.update_counters(|c| {
                        c.scanned += 1;
                        c.found += extraction.question_count;
                        c.saved += delta;
                        c.progress_percent = percent;
                    });
                    progress.success(format!(
                        "[{}/{total}] {} questions, {delta} new records: {}",
                        index + 1,
                        extraction.question_count,
                        target.url
                    ));
                }
                Err(ScanError::Cancelled) => return true,
                Err(e) => {
                    progress.update_counters(|c| {
                        c.scanned += 1;
                        c.progress_percent = percent;
                    });
                    progress.warning(format!("[{}/{total}] skipped: {e}", index + 1));
                }
            }

            tokio::time::sleep(self.config.scan_pacing()).await;
        }

        false
    }

    /// Best-effort read of the persisted record count
    async fn count_records(&self) -> Option<usize> {
        match self
            .records
            .count_records_with_prefix(self.config.record_prefix())
            .await
        {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(target: "lms_autoscan::scan", "Failed to count records: {e:#}");
                None
            }
        }
    }

    fn fail(&self, progress: &ProgressReporter, started: Instant, error: ScanError) -> ScanError {
        self.finish(progress, started, ScanState::Failed);
        error
    }

    fn finish(&self, progress: &ProgressReporter, started: Instant, state: ScanState) -> ScanSummary {
        self.scanning.store(false, Ordering::SeqCst);
        progress.set_state(state);
        if state == ScanState::Stopped {
            progress.warning("Scan stopped");
        }

        let duration = started.elapsed();
        progress.finished(state, duration);
        debug!(target: "lms_autoscan::scan", "Session finished as {state} after {duration:?}");
        self.summary(state, duration)
    }

    fn summary(&self, state: ScanState, duration: Duration) -> ScanSummary {
        let registry = self.registry.lock();
        ScanSummary {
            state,
            counters: self.session.read().counters,
            courses: registry.len(TargetKind::Course),
            quizzes: registry.len(TargetKind::Quiz),
            reviews: registry.len(TargetKind::Review),
            duration,
        }
    }
}

fn validate_review(url: &str, extraction: ReviewExtraction) -> ScanResult<ReviewExtraction> {
    if extraction.is_usable() {
        Ok(extraction)
    } else {
        Err(ScanError::ReviewPageInvalid {
            url: url.to_string(),
            question_count: extraction.question_count,
        })
    }
}

/// Clears the run flags when `start()` returns or its future is dropped
struct RunGuard<'a> {
    running: &'a AtomicBool,
    scanning: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.scanning.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unusable_review_pages_are_rejected() {
        let empty = ReviewExtraction {
            question_count: 0,
            is_valid_review_page: true,
        };
        assert!(matches!(
            validate_review("https://lms.example/mod/quiz/review.php?attempt=1", empty),
            Err(ScanError::ReviewPageInvalid { question_count: 0, .. })
        ));

        let good = ReviewExtraction {
            question_count: 4,
            is_valid_review_page: true,
        };
        assert_eq!(validate_review("u", good).ok(), Some(good));
    }
}
