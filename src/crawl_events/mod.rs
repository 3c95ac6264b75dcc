//! Event system for tracking and reporting scan progress
//!
//! The orchestrator publishes every log line, counter update and state
//! transition here; a CLI, a UI or a test can subscribe independently.

pub mod bus;
pub mod errors;
pub mod metrics;
pub mod types;

pub use bus::{ScanEventBus, recv_event};
pub use errors::EventBusError;
pub use metrics::{EventBusMetrics, MetricsSnapshot};
pub use types::{LogEntry, ScanEvent, Severity};
