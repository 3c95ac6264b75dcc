//! Level-by-level link discovery
//!
//! Seeds are probed in place. Dashboard seeds fan out into their courses,
//! courses into quizzes, quizzes into review links; every seed is also
//! searched for quiz and review links directly. Independent branches run
//! concurrently and the slot pool bounds how many contexts they open.

use std::sync::Arc;

use futures::future::join_all;
use log::debug;
use parking_lot::Mutex;

use super::crawl_types::{CrawlTarget, ScanError, ScanResult, TargetKind};
use super::lifecycle::ContextLifecycleManager;
use super::progress::ProgressReporter;
use super::registry::LinkRegistry;
use crate::page_extractor::{
    PageSnapshot, ReviewKeywords, find_courses, find_direct_review_links, find_quiz_links,
    find_review_links_from_quiz, is_dashboard_url,
};

pub struct DiscoveryEngine<'a> {
    lifecycle: &'a ContextLifecycleManager,
    registry: Arc<Mutex<LinkRegistry>>,
    progress: ProgressReporter,
    keywords: ReviewKeywords,
    locale_param: String,
}

impl<'a> DiscoveryEngine<'a> {
    #[must_use]
    pub fn new(
        lifecycle: &'a ContextLifecycleManager,
        registry: Arc<Mutex<LinkRegistry>>,
        progress: ProgressReporter,
        keywords: ReviewKeywords,
        locale_param: impl Into<String>,
    ) -> Self {
        Self {
            lifecycle,
            registry,
            progress,
            keywords,
            locale_param: locale_param.into(),
        }
    }

    /// Expand every seed; returns the number of review links in the registry
    pub async fn discover(&self, seeds: &[PageSnapshot]) -> usize {
        join_all(seeds.iter().map(|seed| self.expand_seed(seed))).await;
        self.registry.lock().len(TargetKind::Review)
    }

    async fn expand_seed(&self, seed: &PageSnapshot) {
        let mut branches = Vec::new();

        if is_dashboard_url(&seed.url) {
            let courses = self.probe_in_place(seed, "courses", find_courses);
            let fresh = self.register(TargetKind::Course, courses);
            if !fresh.is_empty() {
                self.progress
                    .info(format!("Found {} courses on {}", fresh.len(), seed.url));
            }
            for course in fresh {
                branches.push(Branch::Course(course));
            }
        }

        let reviews = self.probe_in_place(seed, "review links", find_direct_review_links);
        self.register(TargetKind::Review, reviews);

        let quizzes = self.probe_in_place(seed, "quiz links", find_quiz_links);
        for quiz in self.register(TargetKind::Quiz, quizzes) {
            branches.push(Branch::Quiz(quiz));
        }

        join_all(branches.iter().map(|branch| async move {
            match branch {
                Branch::Course(course) => self.find_tests_in_course(course).await,
                Branch::Quiz(quiz) => self.expand_quiz(quiz).await,
            }
        }))
        .await;
    }

    /// Visit a course page and expand every quiz it links to
    pub async fn find_tests_in_course(&self, course: &CrawlTarget) {
        let locale = self.locale_param.as_str();
        let quizzes = match self
            .lifecycle
            .with_page(course, |page| find_quiz_links(page, locale))
            .await
        {
            Ok(quizzes) => quizzes,
            Err(e) => {
                self.degrade(course, &e);
                return;
            }
        };

        let fresh = self.register(TargetKind::Quiz, quizzes);
        debug!(
            target: "lms_autoscan::discovery",
            "{} new quizzes in {}",
            fresh.len(),
            course.url
        );
        join_all(fresh.iter().map(|quiz| self.expand_quiz(quiz))).await;
    }

    /// Visit a quiz page and register its review links
    pub async fn expand_quiz(&self, quiz: &CrawlTarget) {
        let locale = self.locale_param.as_str();
        let keywords = &self.keywords;
        let result = self
            .lifecycle
            .with_page(quiz, |page| find_review_links_from_quiz(page, keywords, locale))
            .await;

        match result {
            Ok(found) if !found.is_passed => {
                debug!(target: "lms_autoscan::discovery", "Quiz not attempted: {}", quiz.url);
            }
            Ok(found) => {
                let fresh = self.register(TargetKind::Review, found.links);
                if !fresh.is_empty() {
                    self.progress
                        .info(format!("Found {} attempts in {}", fresh.len(), quiz.url));
                }
            }
            Err(e) => self.degrade(quiz, &e),
        }
    }

    fn probe_in_place<F>(&self, seed: &PageSnapshot, what: &str, probe: F) -> Vec<String>
    where
        F: FnOnce(&PageSnapshot, &str) -> ScanResult<Vec<String>>,
    {
        match probe(seed, &self.locale_param) {
            Ok(links) => links,
            Err(e) => {
                self.progress
                    .warning(format!("Could not read {what} from {}: {e}", seed.url));
                Vec::new()
            }
        }
    }

    fn register(&self, kind: TargetKind, urls: Vec<String>) -> Vec<CrawlTarget> {
        let fresh = self.registry.lock().extend(kind, urls);
        for target in &fresh {
            self.progress.discovered(target);
        }
        fresh
    }

    /// A failed branch yields no links; the session carries on
    fn degrade(&self, target: &CrawlTarget, error: &ScanError) {
        if matches!(error, ScanError::Cancelled) {
            return;
        }
        self.progress
            .warning(format!("No links from {} {}: {error}", target.kind, target.url));
    }
}

enum Branch {
    Course(CrawlTarget),
    Quiz(CrawlTarget),
}
