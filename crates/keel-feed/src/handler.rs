//! Feed handler: subscription filtering and the consumer worker.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use keel_core::{InstrumentId, Market, Tick};

use crate::queue::TickQueue;

/// Interval the consumer worker waits on an empty queue before
/// re-checking the running flag.
const DRAIN_WAIT: Duration = Duration::from_millis(10);

/// Market data handler.
///
/// Owns the tick staging queue and a consumer worker that forwards ticks
/// for subscribed instruments into the dispatch channel. The feed side
/// calls `push_tick`; everything downstream receives ticks from the
/// channel handed to `new`.
pub struct FeedHandler {
    queue: Arc<TickQueue>,
    subscriptions: Mutex<HashSet<InstrumentId>>,
    endpoints: DashMap<Market, String>,
    ticks_received: AtomicU64,
    running: AtomicBool,
    tick_tx: mpsc::Sender<Tick>,
}

impl FeedHandler {
    /// Create a handler with the given queue capacity, forwarding ticks
    /// into `tick_tx`.
    pub fn new(queue_capacity: usize, tick_tx: mpsc::Sender<Tick>) -> Self {
        Self {
            queue: Arc::new(TickQueue::new(queue_capacity)),
            subscriptions: Mutex::new(HashSet::new()),
            endpoints: DashMap::new(),
            ticks_received: AtomicU64::new(0),
            running: AtomicBool::new(false),
            tick_tx,
        }
    }

    /// Record a market data endpoint. Connection management itself lives
    /// in the connectivity layer; the handler only tracks where each
    /// market's feed comes from.
    pub fn connect_to_market(&self, market: Market, endpoint: &str) {
        info!(%market, endpoint, "feed endpoint registered");
        self.endpoints.insert(market, endpoint.to_string());
    }

    /// Subscribe to an instrument. Returns false if already subscribed.
    pub fn subscribe(&self, instrument: InstrumentId) -> bool {
        self.subscriptions.lock().insert(instrument)
    }

    /// Unsubscribe from an instrument. Returns false if not subscribed.
    pub fn unsubscribe(&self, instrument: InstrumentId) -> bool {
        self.subscriptions.lock().remove(&instrument)
    }

    /// Number of ticks accepted past the subscription filter.
    pub fn ticks_received(&self) -> u64 {
        self.ticks_received.load(Ordering::Relaxed)
    }

    /// Producer entry point: stage a tick for processing. Never blocks.
    pub fn push_tick(&self, tick: Tick) -> bool {
        self.queue.push(tick)
    }

    /// Start the consumer worker. Idempotent once already running.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::AcqRel) {
            return None;
        }

        let handler = Arc::clone(self);
        Some(tokio::spawn(async move { handler.run().await }))
    }

    /// Stop the worker and shut the queue down. Idempotent.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            self.queue.shutdown();
        }
    }

    async fn run(&self) {
        debug!("feed worker started");

        while self.running.load(Ordering::Acquire) {
            let ticks = self.queue.drain(DRAIN_WAIT).await;

            for tick in ticks {
                if !self.is_subscribed(tick.instrument) {
                    continue;
                }

                self.ticks_received.fetch_add(1, Ordering::Relaxed);

                if self.tick_tx.send(tick).await.is_err() {
                    debug!("tick channel closed, feed worker exiting");
                    return;
                }
            }
        }

        debug!("feed worker stopped");
    }

    fn is_subscribed(&self, instrument: InstrumentId) -> bool {
        self.subscriptions.lock().contains(&instrument)
    }
}
