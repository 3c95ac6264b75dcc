//! Test utilities shared by the integration tests
//!
//! `FixtureBackend` plays the browser: it serves HTML by URL, tracks how many
//! contexts are open, and can be told to fail or hang for specific URLs.
//! `FixtureRecords` plays the record store and grows when a review page with
//! questions is captured, the way the real record writer would.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use url::Url;

use lms_autoscan::backend::{BrowsingBackend, ContextHandle, RecordStore, StaticSeeds};
use lms_autoscan::config::ScanConfig;
use lms_autoscan::page_extractor::PageSnapshot;

pub const SITE: &str = "https://lms.example";

pub fn url(path: &str) -> String {
    format!("{SITE}{path}")
}

/// Fixture key of a URL: fragment and locale parameter removed
pub fn page_key(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };
    parsed.set_fragment(None);
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "lang")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    parsed.to_string()
}

pub fn html_page(body: &str) -> String {
    format!("<!DOCTYPE html><html><head><title>fixture</title></head><body>{body}</body></html>")
}

pub fn review_page(questions: usize) -> String {
    let blocks: String = (0..questions)
        .map(|i| format!(r#"<div class="que multichoice"><div class="qtext">Question {i}</div></div>"#))
        .collect();
    format!(
        r#"<!DOCTYPE html><html><head><title>Review</title></head><body id="page-mod-quiz-review">{blocks}</body></html>"#
    )
}

pub fn quiz_with_attempts(attempts: &[u32]) -> String {
    let rows: String = attempts
        .iter()
        .map(|a| format!(r#"<tr><td><a href="/mod/quiz/review.php?attempt={a}">Просмотр</a></td></tr>"#))
        .collect();
    html_page(&format!(
        r#"<table class="generaltable quizattemptsummary">{rows}</table>"#
    ))
}

pub fn unattempted_quiz() -> String {
    html_page(
        r#"<div class="quizstartbuttondiv"><form action="/mod/quiz/startattempt.php"><button>Start</button></form></div>"#,
    )
}

#[derive(Debug, Default)]
struct BackendState {
    /// handle -> canonical url
    open: HashMap<u64, String>,
    peak_open: usize,
    opened: Vec<String>,
    closed: usize,
    open_attempts: Vec<(String, Instant)>,
    /// page key -> remaining injected failures
    failures: HashMap<String, u32>,
}

pub struct FixtureBackend {
    pages: HashMap<String, String>,
    hanging: HashSet<String>,
    next_id: AtomicU64,
    state: Mutex<BackendState>,
    records: Arc<AtomicUsize>,
    /// page key -> records "written" when that page is captured
    record_gain: HashMap<String, usize>,
    /// page key -> records another writer deletes while that page is open
    record_loss: HashMap<String, usize>,
}

impl FixtureBackend {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            hanging: HashSet::new(),
            next_id: AtomicU64::new(1),
            state: Mutex::new(BackendState::default()),
            records: Arc::new(AtomicUsize::new(0)),
            record_gain: HashMap::new(),
            record_loss: HashMap::new(),
        }
    }

    pub fn page(mut self, path: &str, html: String) -> Self {
        self.pages.insert(page_key(&url(path)), html);
        self
    }

    /// Serve a review page and count `saved` new records when it is captured
    pub fn review(mut self, path: &str, questions: usize, saved: usize) -> Self {
        let key = page_key(&url(path));
        self.pages.insert(key.clone(), review_page(questions));
        self.record_gain.insert(key, saved);
        self
    }

    /// Serve a review page during whose visit `removed` records vanish
    pub fn review_with_store_shrink(mut self, path: &str, questions: usize, removed: usize) -> Self {
        let key = page_key(&url(path));
        self.pages.insert(key.clone(), review_page(questions));
        self.record_loss.insert(key, removed);
        self
    }

    /// The first `times` creation attempts for `path` fail
    pub fn fail_open(self, path: &str, times: u32) -> Self {
        self.state.lock().failures.insert(page_key(&url(path)), times);
        self
    }

    /// Contexts for `path` never report load-complete
    pub fn hang(mut self, path: &str) -> Self {
        self.hanging.insert(page_key(&url(path)));
        self
    }

    pub fn records(&self) -> FixtureRecords {
        FixtureRecords {
            count: Arc::clone(&self.records),
        }
    }

    pub fn open_now(&self) -> usize {
        self.state.lock().open.len()
    }

    pub fn peak_open(&self) -> usize {
        self.state.lock().peak_open
    }

    pub fn opened(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }

    pub fn opened_count(&self) -> usize {
        self.state.lock().opened.len()
    }

    pub fn closed_count(&self) -> usize {
        self.state.lock().closed
    }

    pub fn open_attempts(&self) -> Vec<(String, Instant)> {
        self.state.lock().open_attempts.clone()
    }

    fn url_of(&self, handle: ContextHandle) -> Result<String> {
        self.state
            .lock()
            .open
            .get(&handle.0)
            .cloned()
            .ok_or_else(|| anyhow!("unknown context {handle}"))
    }
}

#[async_trait]
impl BrowsingBackend for FixtureBackend {
    async fn open_context(&self, url: &str) -> Result<ContextHandle> {
        let key = page_key(url);
        let mut state = self.state.lock();
        state.open_attempts.push((url.to_string(), Instant::now()));

        if let Some(remaining) = state.failures.get_mut(&key)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(anyhow!("tab creation refused for {url}"));
        }

        let handle = ContextHandle(self.next_id.fetch_add(1, Ordering::SeqCst));
        state.open.insert(handle.0, url.to_string());
        state.opened.push(url.to_string());
        let open = state.open.len();
        state.peak_open = state.peak_open.max(open);
        Ok(handle)
    }

    async fn wait_for_load(&self, handle: ContextHandle) -> Result<()> {
        let url = self.url_of(handle)?;
        if self.hanging.contains(&page_key(&url)) {
            std::future::pending::<()>().await;
        }
        // Let overlapping branches interleave like real tabs do
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn capture(&self, handle: ContextHandle) -> Result<PageSnapshot> {
        let url = self.url_of(handle)?;
        let key = page_key(&url);
        let html = self
            .pages
            .get(&key)
            .cloned()
            .unwrap_or_else(|| html_page("<h1>Not found</h1>"));
        if let Some(gain) = self.record_gain.get(&key) {
            self.records.fetch_add(*gain, Ordering::SeqCst);
        }
        if let Some(loss) = self.record_loss.get(&key) {
            self.records().remove(*loss);
        }
        Ok(PageSnapshot::new(url, "fixture", html))
    }

    async fn close_context(&self, handle: ContextHandle) -> Result<()> {
        let mut state = self.state.lock();
        if state.open.remove(&handle.0).is_some() {
            state.closed += 1;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct FixtureRecords {
    count: Arc<AtomicUsize>,
}

impl FixtureRecords {
    pub fn get(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Simulate another writer touching the store
    pub fn add(&self, n: usize) {
        self.count.fetch_add(n, Ordering::SeqCst);
    }

    /// Simulate another writer deleting records; never goes below zero
    pub fn remove(&self, n: usize) {
        let _ = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some(c.saturating_sub(n)));
    }
}

#[async_trait]
impl RecordStore for FixtureRecords {
    async fn count_records_with_prefix(&self, _prefix: &str) -> Result<usize> {
        Ok(self.get())
    }
}

pub fn site() -> Url {
    Url::parse(SITE).expect("fixture site url")
}

pub fn seed(path: &str, body: &str) -> PageSnapshot {
    PageSnapshot::new(url(path), "seed", html_page(body))
}

pub fn seeds(pages: Vec<PageSnapshot>) -> Arc<StaticSeeds> {
    Arc::new(StaticSeeds::new(pages, &site()))
}

pub fn test_config() -> ScanConfig {
    ScanConfig::builder()
        .site_url(SITE)
        .build()
        .expect("valid test config")
}

/// Config with every delay at zero, for tests that run on real time
pub fn fast_config() -> ScanConfig {
    ScanConfig::builder()
        .site_url(SITE)
        .settle_delays_ms(0, 0, 0)
        .review_persist_settle_ms(0)
        .close_delay_ms(0)
        .scan_pacing_ms(0)
        .retry_backoff_step_ms(0)
        .slot_poll_interval_ms(50)
        .build()
        .expect("valid fast config")
}
