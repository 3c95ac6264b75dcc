//! Page capture and extraction probes.
//!
//! `extractors` talks to a live browser page; `probes` works on the captured
//! [`PageSnapshot`] only.

pub mod extractors;
pub mod js_scripts;
pub mod probes;
pub mod schema;

pub use extractors::{capture_snapshot, wait_for_ready_state};
pub use probes::{
    ReviewKeywords, analyze_review_page, find_courses, find_direct_review_links,
    find_quiz_links, find_review_links_from_quiz, is_dashboard_url,
};
pub use schema::{PageSnapshot, QuizReviewLinks, ReviewExtraction};
