//! Bounded tick staging queue with wake-on-push signaling.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use keel_core::Tick;

/// Single-producer/single-consumer staging queue from the market feed to
/// the strategy dispatcher.
///
/// `push` never blocks the producer; the consumer performs a bounded wait
/// in `drain`. Capacity is advisory: exceeding it logs a warning but no
/// accepted tick is dropped in normal operation. After `shutdown`, ticks
/// still queued are abandoned (at-most-once-on-shutdown).
#[derive(Debug)]
pub struct TickQueue {
    inner: Mutex<VecDeque<Tick>>,
    notify: Notify,
    stopped: AtomicBool,
    capacity: usize,
}

impl TickQueue {
    /// Create a queue with the given advisory capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            stopped: AtomicBool::new(false),
            capacity,
        }
    }

    /// Enqueue a tick and wake the consumer. Never blocks.
    ///
    /// Returns false once the queue has been shut down; the tick is
    /// discarded in that case.
    pub fn push(&self, tick: Tick) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }

        {
            let mut queue = self.inner.lock();
            if queue.len() >= self.capacity {
                warn!(
                    depth = queue.len(),
                    capacity = self.capacity,
                    "tick queue over advisory capacity"
                );
            }
            queue.push_back(tick);
        }

        self.notify.notify_one();
        true
    }

    /// Consumer-side bounded wait.
    ///
    /// Returns all queued ticks in FIFO order, or an empty vec when the
    /// timeout elapses or the queue has been shut down.
    pub async fn drain(&self, timeout: Duration) -> Vec<Tick> {
        if self.stopped.load(Ordering::Acquire) {
            return Vec::new();
        }

        {
            let mut queue = self.inner.lock();
            if !queue.is_empty() {
                return queue.drain(..).collect();
            }
        }

        // Queue was empty: wait for a push or shutdown wakeup. A push that
        // races this registration leaves a stored permit, so the wakeup is
        // never lost.
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;

        if self.stopped.load(Ordering::Acquire) {
            return Vec::new();
        }
        self.inner.lock().drain(..).collect()
    }

    /// Shut the queue down. Idempotent; wakes any blocked consumer.
    ///
    /// Subsequent `drain` calls return immediately with no ticks.
    pub fn shutdown(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }

    /// Whether `shutdown` has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Current queue depth.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
