pub mod backend;
pub mod browser_profile;
pub mod browser_setup;
pub mod config;
pub mod crawl_engine;
pub mod crawl_events;
pub mod harvest;
pub mod page_extractor;
pub mod slot_pool;
pub mod utils;

pub use backend::{BrowsingBackend, ContextHandle, RecordStore, SeedSource};
pub use config::ScanConfig;
pub use crawl_engine::{
    AutoScanner, CrawlTarget, ScanCounters, ScanError, ScanResult, ScanSession, ScanState,
    ScanSummary, TargetKind,
};
pub use crawl_events::{LogEntry, ScanEvent, Severity};
pub use page_extractor::schema::*;
