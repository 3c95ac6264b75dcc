//! Data types produced by page capture and the extraction probes

use serde::{Deserialize, Serialize};

/// Serialized state of a loaded page
///
/// Everything a probe reads comes from here, so probes never touch the
/// browser and can run against fixture HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// `location.href` after load, redirects included
    pub url: String,
    pub title: String,
    /// `document.documentElement.outerHTML`
    pub html: String,
}

impl PageSnapshot {
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            html: html.into(),
        }
    }
}

/// Review links found on a quiz page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizReviewLinks {
    pub links: Vec<String>,
    /// The quiz has at least one recorded attempt
    pub is_passed: bool,
}

/// What the review probe learned about a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewExtraction {
    pub question_count: usize,
    pub is_valid_review_page: bool,
}

impl ReviewExtraction {
    /// A review page worth counting: recognized and carrying questions
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.is_valid_review_page && self.question_count > 0
    }
}
