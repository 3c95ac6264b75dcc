//! Bounded pool of page-context slots
//!
//! Caps how many isolated contexts exist at once. A slot is held by an RAII
//! [`SlotGuard`]; dropping the guard on any exit path frees the slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::debug;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::crawl_engine::{ScanError, ScanResult};

#[derive(Debug)]
pub struct SlotPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    /// Slots currently held
    open: Arc<AtomicUsize>,
    /// Highest value `open` has reached
    peak: Arc<AtomicUsize>,
    poll_interval: Duration,
}

impl SlotPool {
    /// Create a pool with `capacity` slots
    ///
    /// `poll_interval` is how long a saturated `acquire` waits between
    /// progress log lines; the wait itself is woken as soon as a slot frees.
    #[must_use]
    pub fn new(capacity: usize, poll_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            open: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            poll_interval,
        }
    }

    /// Suspend until a slot is free, then reserve it
    ///
    /// No fairness guarantee between concurrent waiters beyond the
    /// semaphore's FIFO queue.
    pub async fn acquire(&self) -> ScanResult<SlotGuard> {
        let mut waited = 0u32;
        loop {
            let permit = Arc::clone(&self.semaphore).acquire_owned();
            match tokio::time::timeout(self.poll_interval, permit).await {
                Ok(Ok(permit)) => {
                    let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
                    self.peak.fetch_max(open, Ordering::SeqCst);
                    debug!(
                        target: "lms_autoscan::slots",
                        "Slot acquired ({open}/{}) after {waited} waits",
                        self.capacity
                    );
                    return Ok(SlotGuard {
                        _permit: permit,
                        open: Arc::clone(&self.open),
                    });
                }
                Ok(Err(_)) => return Err(ScanError::SlotPoolClosed),
                Err(_) => {
                    waited += 1;
                    debug!(
                        target: "lms_autoscan::slots",
                        "All {} slots busy, still waiting ({waited})",
                        self.capacity
                    );
                }
            }
        }
    }

    /// Refuse all further acquisitions; held slots stay valid
    pub fn close(&self) {
        self.semaphore.close();
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A reserved slot; released on drop
#[derive(Debug)]
pub struct SlotGuard {
    _permit: OwnedSemaphorePermit,
    open: Arc<AtomicUsize>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn saturated_pool_waits_for_release() {
        let pool = Arc::new(SlotPool::new(2, Duration::from_secs(1)));
        let first = pool.acquire().await.expect("slot");
        let second = pool.acquire().await.expect("slot");
        assert_eq!(pool.open_count(), 2);

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.acquire().await.map(|_guard| ()) })
        };

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.expect("join").expect("slot after release");
        drop(second);
        assert_eq!(pool.open_count(), 0);
        assert_eq!(pool.peak(), 2);
    }

    #[tokio::test]
    async fn closed_pool_refuses_acquire() {
        let pool = SlotPool::new(1, Duration::from_millis(10));
        pool.close();
        assert!(matches!(pool.acquire().await, Err(ScanError::SlotPoolClosed)));
    }
}
