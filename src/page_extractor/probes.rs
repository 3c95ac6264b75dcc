//! Link discovery and review probes
//!
//! Pure functions over a [`PageSnapshot`]. Each returns a page-local,
//! order-preserving, deduplicated list of normalized absolute URLs. URL
//! shapes follow the Moodle layout the LMS is built on.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::schema::{PageSnapshot, QuizReviewLinks, ReviewExtraction};
use crate::crawl_engine::{ScanError, ScanResult};
use crate::utils::normalize_discovered_url;

static COURSE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/course/view\.php\?(?:[^#]*&)?id=\d+").expect("Invalid course link regex")
});

static QUIZ_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/mod/quiz/view\.php\?(?:[^#]*&)?id=\d+").expect("Invalid quiz link regex")
});

static REVIEW_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/mod/quiz/review\.php\?(?:[^#]*&)?attempt=\d+").expect("Invalid review link regex")
});

/// Review-style anchor with or without an attempt id, used by the keyword fallback
static REVIEW_STYLE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/mod/quiz/review\.php").expect("Invalid review style regex"));

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Invalid anchor selector"));

static ATTEMPT_HISTORY: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table.quizattemptsummary, .quizattemptsummary")
        .expect("Invalid attempt history selector")
});

static START_ATTEMPT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".quizstartbuttondiv, form[action*='startattempt.php']")
        .expect("Invalid start attempt selector")
});

static REVIEW_BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body#page-mod-quiz-review").expect("Invalid review body selector"));

static QUESTION_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".que").expect("Invalid question block selector"));

/// Paths that identify the site landing page or a user dashboard
const DASHBOARD_PATHS: &[&str] = &[
    "/",
    "/index.php",
    "/my",
    "/my/",
    "/my/index.php",
    "/my/courses.php",
];

/// Visible link texts that mark a "review attempt" anchor, all locales merged
#[derive(Debug, Clone, Default)]
pub struct ReviewKeywords {
    words: Vec<String>,
}

impl ReviewKeywords {
    #[must_use]
    pub fn from_map(map: &BTreeMap<String, Vec<String>>) -> Self {
        let mut words: Vec<String> = map
            .values()
            .flatten()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        words.sort();
        words.dedup();
        Self { words }
    }

    /// Case-insensitive substring match against any keyword
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.words.iter().any(|w| text.contains(w.as_str()))
    }
}

/// Whether `url` is the site landing page or a dashboard
#[must_use]
pub fn is_dashboard_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|parsed| DASHBOARD_PATHS.contains(&parsed.path()))
}

/// Anchors on a landing/dashboard page that lead to a course
pub fn find_courses(snapshot: &PageSnapshot, locale_param: &str) -> ScanResult<Vec<String>> {
    matching_links(snapshot, locale_param, &COURSE_LINK)
}

/// Anchors that lead to a quiz detail page
pub fn find_quiz_links(snapshot: &PageSnapshot, locale_param: &str) -> ScanResult<Vec<String>> {
    matching_links(snapshot, locale_param, &QUIZ_LINK)
}

/// Review anchors carrying an attempt id, anywhere on the page
pub fn find_direct_review_links(
    snapshot: &PageSnapshot,
    locale_param: &str,
) -> ScanResult<Vec<String>> {
    matching_links(snapshot, locale_param, &REVIEW_LINK)
}

/// Review links on a quiz page, plus whether the quiz was attempted at all
///
/// A page showing only the start control and no attempt history is an
/// unattempted quiz. With a history table, review links inside it win; when
/// it holds none (or there is no table), anchors pointing at the review
/// script whose visible text contains a review keyword are used instead.
pub fn find_review_links_from_quiz(
    snapshot: &PageSnapshot,
    keywords: &ReviewKeywords,
    locale_param: &str,
) -> ScanResult<QuizReviewLinks> {
    let base = snapshot_base(snapshot)?;
    let document = Html::parse_document(&snapshot.html);

    let history: Vec<ElementRef<'_>> = document.select(&ATTEMPT_HISTORY).collect();
    let has_start_control = document.select(&START_ATTEMPT).next().is_some();

    if history.is_empty() && has_start_control {
        return Ok(QuizReviewLinks {
            links: Vec::new(),
            is_passed: false,
        });
    }

    let mut links = LinkSet::default();
    for table in &history {
        for anchor in table.select(&ANCHOR) {
            if let Some(url) = anchor_url(&anchor, &base, locale_param)
                .filter(|url| REVIEW_LINK.is_match(url))
            {
                links.push(url);
            }
        }
    }

    if links.is_empty() {
        for anchor in document.select(&ANCHOR) {
            let text: String = anchor.text().collect();
            if !keywords.matches(&text) {
                continue;
            }
            if let Some(url) = anchor_url(&anchor, &base, locale_param)
                .filter(|url| REVIEW_STYLE_LINK.is_match(url))
            {
                links.push(url);
            }
        }
    }

    let links = links.into_vec();
    Ok(QuizReviewLinks {
        is_passed: !history.is_empty() || !links.is_empty(),
        links,
    })
}

/// Recognize a review page and count its question blocks
#[must_use]
pub fn analyze_review_page(snapshot: &PageSnapshot) -> ReviewExtraction {
    let document = Html::parse_document(&snapshot.html);
    let is_valid_review_page = REVIEW_STYLE_LINK.is_match(&snapshot.url)
        || document.select(&REVIEW_BODY).next().is_some();

    ReviewExtraction {
        question_count: document.select(&QUESTION_BLOCK).count(),
        is_valid_review_page,
    }
}

fn snapshot_base(snapshot: &PageSnapshot) -> ScanResult<Url> {
    Url::parse(&snapshot.url).map_err(|e| ScanError::ProbeExecution {
        url: snapshot.url.clone(),
        message: format!("page URL is not absolute: {e}"),
    })
}

fn anchor_url(anchor: &ElementRef<'_>, base: &Url, locale_param: &str) -> Option<String> {
    anchor
        .value()
        .attr("href")
        .and_then(|href| normalize_discovered_url(base, href, locale_param))
}

fn matching_links(
    snapshot: &PageSnapshot,
    locale_param: &str,
    pattern: &Regex,
) -> ScanResult<Vec<String>> {
    let base = snapshot_base(snapshot)?;
    let document = Html::parse_document(&snapshot.html);

    let mut links = LinkSet::default();
    for anchor in document.select(&ANCHOR) {
        if let Some(url) =
            anchor_url(&anchor, &base, locale_param).filter(|url| pattern.is_match(url))
        {
            links.push(url);
        }
    }
    Ok(links.into_vec())
}

/// Insertion-ordered set used for page-local dedup
#[derive(Default)]
struct LinkSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl LinkSet {
    fn push(&mut self, url: String) {
        if self.seen.insert(url.clone()) {
            self.ordered.push(url);
        }
    }

    fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}
