//! Scan Engine Module
//!
//! Discovery of courses, quizzes and review pages, the context lifecycle
//! every visit goes through, and the orchestrator that runs a session.

pub mod cleanup;
pub mod crawl_types;
pub mod discovery;
pub mod lifecycle;
pub mod orchestrator;
pub mod page_timeout;
pub mod progress;
pub mod registry;
pub mod session;

pub use cleanup::{CleanupResult, shutdown_browser};
pub use crawl_types::{CrawlTarget, ScanError, ScanResult, ScanState, TargetKind};
pub use discovery::DiscoveryEngine;
pub use lifecycle::ContextLifecycleManager;
pub use orchestrator::AutoScanner;
pub use progress::ProgressReporter;
pub use registry::LinkRegistry;
pub use session::{ScanCounters, ScanSession, ScanSummary};
