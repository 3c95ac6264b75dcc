//! Event bus for publishing and subscribing to scan events

use std::sync::Arc;
use tokio::sync::broadcast;

use super::errors::EventBusError;
use super::metrics::{EventBusMetrics, MetricsSnapshot};
use super::types::ScanEvent;

/// Broadcast bus carrying [`ScanEvent`]s from the orchestrator to observers
///
/// Cloning is cheap and every clone publishes into the same channel.
#[derive(Debug, Clone)]
pub struct ScanEventBus {
    sender: broadcast::Sender<ScanEvent>,
    metrics: Arc<EventBusMetrics>,
}

impl ScanEventBus {
    /// Create a new event bus with the specified capacity
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of events buffered per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            metrics: Arc::new(EventBusMetrics::new()),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Publish an event to all subscribers
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of active subscribers that received the event
    /// * `Err(EventBusError::NoSubscribers)` - Nobody is listening; the event
    ///   is counted as dropped
    pub fn publish(&self, event: ScanEvent) -> Result<usize, EventBusError> {
        self.metrics.increment_published();
        match self.sender.send(event) {
            Ok(subscriber_count) => {
                self.metrics.update_subscriber_count(subscriber_count);
                Ok(subscriber_count)
            }
            Err(_) => {
                self.metrics.increment_dropped();
                self.metrics.update_subscriber_count(0);
                log::trace!("Published scan event with no active subscribers");
                Err(EventBusError::NoSubscribers)
            }
        }
    }

    /// Subscribe to events
    ///
    /// The receiver only sees events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        let receiver = self.sender.subscribe();
        self.metrics
            .update_subscriber_count(self.sender.receiver_count());
        receiver
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }
}

/// Receive the next event, mapping broadcast errors onto [`EventBusError`]
pub async fn recv_event(
    receiver: &mut broadcast::Receiver<ScanEvent>,
) -> Result<ScanEvent, EventBusError> {
    match receiver.recv().await {
        Ok(event) => Ok(event),
        Err(broadcast::error::RecvError::Lagged(missed)) => {
            Err(EventBusError::ReceiverLagged(missed))
        }
        Err(broadcast::error::RecvError::Closed) => Err(EventBusError::Shutdown),
    }
}
