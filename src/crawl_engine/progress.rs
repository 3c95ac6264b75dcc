//! Progress reporting for a scan session
//!
//! Every user-facing log line is appended to the session log and broadcast
//! on the event bus. Diagnostic logging goes through `log` as usual.

use std::sync::Arc;

use parking_lot::RwLock;

use super::crawl_types::{CrawlTarget, ScanState};
use super::session::{ScanCounters, ScanSession};
use crate::crawl_events::{LogEntry, ScanEvent, ScanEventBus, Severity};

#[derive(Clone)]
pub struct ProgressReporter {
    session: Arc<RwLock<ScanSession>>,
    bus: ScanEventBus,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(session: Arc<RwLock<ScanSession>>, bus: ScanEventBus) -> Self {
        Self { session, bus }
    }

    fn publish(&self, event: ScanEvent) {
        // Nobody listening is fine; the session log still has everything
        let _ = self.bus.publish(event);
    }

    pub fn log(&self, message: impl Into<String>, severity: Severity) {
        let entry = LogEntry::new(message, severity);
        match severity {
            Severity::Info | Severity::Success => {
                log::info!(target: "lms_autoscan::progress", "{}", entry.message);
            }
            Severity::Warning => log::warn!(target: "lms_autoscan::progress", "{}", entry.message),
            Severity::Error => log::error!(target: "lms_autoscan::progress", "{}", entry.message),
        }
        self.session.write().log.push(entry.clone());
        self.publish(ScanEvent::Log(entry));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(message, Severity::Info);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(message, Severity::Success);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(message, Severity::Warning);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(message, Severity::Error);
    }

    /// Move the session to `to`, returning the previous state
    pub fn set_state(&self, to: ScanState) -> ScanState {
        let from = {
            let mut session = self.session.write();
            std::mem::replace(&mut session.state, to)
        };
        if from != to {
            self.publish(ScanEvent::StateChanged { from, to });
        }
        from
    }

    #[must_use]
    pub fn state(&self) -> ScanState {
        self.session.read().state
    }

    /// Apply `update` to the counters and broadcast the result
    pub fn update_counters(&self, update: impl FnOnce(&mut ScanCounters)) -> ScanCounters {
        let counters = {
            let mut session = self.session.write();
            update(&mut session.counters);
            session.counters
        };
        self.publish(ScanEvent::Counters(counters));
        counters
    }

    #[must_use]
    pub fn counters(&self) -> ScanCounters {
        self.session.read().counters
    }

    pub fn started(&self, site_url: &str) {
        self.publish(ScanEvent::session_started(site_url));
    }

    pub fn discovered(&self, target: &CrawlTarget) {
        self.publish(ScanEvent::TargetDiscovered {
            target: target.clone(),
        });
    }

    pub fn finished(&self, state: ScanState, duration: std::time::Duration) {
        let counters = self.counters();
        self.publish(ScanEvent::session_finished(state, counters, duration));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_lines_reach_session_and_subscribers() {
        let session = Arc::new(RwLock::new(ScanSession::default()));
        let bus = ScanEventBus::new(16);
        let mut rx = bus.subscribe();
        let progress = ProgressReporter::new(Arc::clone(&session), bus);

        progress.warning("page skipped");
        progress.set_state(ScanState::Discovering);
        progress.update_counters(|c| c.scanned += 1);

        let log = session.read().log.clone();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].severity, Severity::Warning);

        assert!(matches!(rx.try_recv(), Ok(ScanEvent::Log(_))));
        assert!(matches!(
            rx.try_recv(),
            Ok(ScanEvent::StateChanged {
                from: ScanState::Idle,
                to: ScanState::Discovering
            })
        ));
        assert!(matches!(rx.try_recv(), Ok(ScanEvent::Counters(c)) if c.scanned == 1));
    }

    #[test]
    fn session_boundaries_are_published() {
        let session = Arc::new(RwLock::new(ScanSession::default()));
        let bus = ScanEventBus::new(16);
        let mut rx = bus.subscribe();
        let progress = ProgressReporter::new(Arc::clone(&session), bus.clone());

        progress.started("https://lms.example/");
        progress.finished(ScanState::Completed, std::time::Duration::from_secs(1));

        assert!(matches!(
            rx.try_recv(),
            Ok(ScanEvent::SessionStarted { site_url, .. }) if site_url == "https://lms.example/"
        ));
        assert!(matches!(rx.try_recv(), Ok(event) if event.is_terminal()));
        assert_eq!(bus.metrics().events_published, 2);
    }
}
