//! The execution dispatch pipeline.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use keel_core::{Order, OrderState};
use keel_ledger::{ExecutionReport, OrderLedger};

use crate::connectivity::Connectivity;
use crate::error::ExecError;

/// Worker poll cadence for both queues.
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Queue capacity for outbound orders and inbound reports.
const QUEUE_CAPACITY: usize = 1024;

/// Dual-queue dispatch pipeline between the ledger and the venue.
///
/// Outbound carries order snapshots awaiting wire dispatch; inbound
/// carries execution reports back into the ledger. Each queue has a
/// dedicated worker polling on a short fixed interval, both governed by
/// one shared running flag. Acknowledgments for accepted sends are
/// synthesized (`PendingNew -> New`, `PendingCancel -> Cancelled`) and
/// travel through the inbound path, so the state machine sees the same
/// flow whether the venue is simulated or live.
///
/// After `stop()` nothing further reaches the ledger, including items
/// still queued at shutdown. The pipeline is single-shot: a stopped
/// pipeline cannot be restarted.
pub struct ExecutionPipeline {
    outbound_tx: mpsc::Sender<Order>,
    outbound_rx: Mutex<Option<mpsc::Receiver<Order>>>,
    inbound_tx: mpsc::Sender<ExecutionReport>,
    inbound_rx: Mutex<Option<mpsc::Receiver<ExecutionReport>>>,
    connectivity: Arc<dyn Connectivity>,
    ledger: Arc<OrderLedger>,
    running: AtomicBool,
    orders_dispatched: AtomicU64,
    reports_applied: AtomicU64,
}

impl ExecutionPipeline {
    pub fn new(connectivity: Arc<dyn Connectivity>, ledger: Arc<OrderLedger>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        Self {
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            connectivity,
            ledger,
            running: AtomicBool::new(false),
            orders_dispatched: AtomicU64::new(0),
            reports_applied: AtomicU64::new(0),
        }
    }

    /// Spawn the two workers. Idempotent; returns `None` when already
    /// started (or started once before).
    pub fn start(self: &Arc<Self>) -> Option<(JoinHandle<()>, JoinHandle<()>)> {
        if self.running.swap(true, Ordering::SeqCst) {
            return None;
        }
        let receivers = (self.outbound_rx.lock().take(), self.inbound_rx.lock().take());
        let (Some(outbound_rx), Some(inbound_rx)) = receivers else {
            self.running.store(false, Ordering::SeqCst);
            warn!("execution pipeline cannot restart after stop");
            return None;
        };

        info!("execution pipeline started");
        let outbound = tokio::spawn(Arc::clone(self).outbound_worker(outbound_rx));
        let inbound = tokio::spawn(Arc::clone(self).inbound_worker(inbound_rx));
        Some((outbound, inbound))
    }

    /// Halt both workers. Idempotent.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("execution pipeline stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Queue an order snapshot for wire dispatch.
    pub fn dispatch(&self, order: Order) -> Result<(), ExecError> {
        if !self.is_running() {
            return Err(ExecError::NotRunning);
        }
        self.outbound_tx.try_send(order).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ExecError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ExecError::QueueClosed,
        })
    }

    /// Queue an execution report on the inbound path (venue fills, or
    /// simulated executions from a driver).
    pub fn submit_report(&self, report: ExecutionReport) -> Result<(), ExecError> {
        if !self.is_running() {
            return Err(ExecError::NotRunning);
        }
        self.inbound_tx.try_send(report).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ExecError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ExecError::QueueClosed,
        })
    }

    /// Orders accepted by the venue.
    pub fn orders_dispatched(&self) -> u64 {
        self.orders_dispatched.load(Ordering::Relaxed)
    }

    /// Reports successfully folded into the ledger.
    pub fn reports_applied(&self) -> u64 {
        self.reports_applied.load(Ordering::Relaxed)
    }

    async fn outbound_worker(self: Arc<Self>, mut rx: mpsc::Receiver<Order>) {
        let mut ticker = interval(POLL_INTERVAL);
        while self.is_running() {
            ticker.tick().await;
            while let Ok(order) = rx.try_recv() {
                // Re-check so items queued at shutdown are not sent.
                if !self.is_running() {
                    return;
                }
                self.send(order);
            }
        }
    }

    fn send(&self, order: Order) {
        match order.state {
            OrderState::PendingNew => {
                if self.connectivity.send_order(&order) {
                    self.orders_dispatched.fetch_add(1, Ordering::Relaxed);
                    self.acknowledge(ExecutionReport::ack(order.id, OrderState::New));
                } else {
                    // Ledger state is left untouched; no retry here.
                    warn!(order_id = order.id, market = %order.market, "order send failed");
                }
            }
            OrderState::PendingCancel => {
                if self.connectivity.cancel_order(order.id, order.market) {
                    self.acknowledge(ExecutionReport::ack(order.id, OrderState::Cancelled));
                } else {
                    warn!(order_id = order.id, market = %order.market, "cancel send failed");
                }
            }
            state => {
                warn!(order_id = order.id, %state, "unexpected state on outbound queue");
            }
        }
    }

    fn acknowledge(&self, report: ExecutionReport) {
        if self.inbound_tx.try_send(report).is_err() {
            warn!("inbound queue unavailable; acknowledgment dropped");
        }
    }

    async fn inbound_worker(self: Arc<Self>, mut rx: mpsc::Receiver<ExecutionReport>) {
        let mut ticker = interval(POLL_INTERVAL);
        while self.is_running() {
            ticker.tick().await;
            while let Ok(report) = rx.try_recv() {
                if !self.is_running() {
                    return;
                }
                match self.ledger.apply_execution(&report) {
                    Ok(()) => {
                        self.reports_applied.fetch_add(1, Ordering::Relaxed);
                        debug!(order_id = report.order_id, state = %report.state, "report applied");
                    }
                    Err(err) => {
                        warn!(order_id = report.order_id, %err, "report rejected by ledger");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::MockConnectivity;
    use keel_core::{Market, OrderIntent, OrderSide, Price, Qty};
    use keel_ledger::OrderEvent;
    use rust_decimal_macros::dec;
    use tokio::time::sleep;

    const SETTLE: Duration = Duration::from_millis(50);

    fn intent() -> OrderIntent {
        OrderIntent::limit(
            1,
            OrderSide::Buy,
            Price::new(dec!(10)),
            Qty::new(dec!(5)),
            Market::UsaNyse,
        )
    }

    fn harness(
        connectivity: MockConnectivity,
    ) -> (Arc<ExecutionPipeline>, Arc<OrderLedger>, mpsc::Receiver<OrderEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let ledger = Arc::new(OrderLedger::new(tx));
        let pipeline = Arc::new(ExecutionPipeline::new(
            Arc::new(connectivity),
            Arc::clone(&ledger),
        ));
        (pipeline, ledger, rx)
    }

    #[tokio::test]
    async fn test_accepted_send_acknowledges_pending_new_to_new() {
        let mut mock = MockConnectivity::new();
        mock.expect_send_order().times(1).returning(|_| true);
        let (pipeline, ledger, _events) = harness(mock);
        pipeline.start();

        let id = ledger.submit(&intent()).unwrap();
        pipeline.dispatch(ledger.get(id)).unwrap();
        sleep(SETTLE).await;

        assert_eq!(ledger.status(id), OrderState::New);
        assert_eq!(pipeline.orders_dispatched(), 1);
        assert_eq!(pipeline.reports_applied(), 1);
    }

    #[tokio::test]
    async fn test_refused_send_leaves_ledger_untouched() {
        let mut mock = MockConnectivity::new();
        mock.expect_send_order().times(1).returning(|_| false);
        let (pipeline, ledger, _events) = harness(mock);
        pipeline.start();

        let id = ledger.submit(&intent()).unwrap();
        pipeline.dispatch(ledger.get(id)).unwrap();
        sleep(SETTLE).await;

        assert_eq!(ledger.status(id), OrderState::PendingNew);
        assert_eq!(pipeline.orders_dispatched(), 0);
    }

    #[tokio::test]
    async fn test_cancel_acknowledges_pending_cancel_to_cancelled() {
        let mut mock = MockConnectivity::new();
        mock.expect_send_order().returning(|_| true);
        mock.expect_cancel_order().times(1).returning(|_, _| true);
        let (pipeline, ledger, _events) = harness(mock);
        pipeline.start();

        let id = ledger.submit(&intent()).unwrap();
        pipeline.dispatch(ledger.get(id)).unwrap();
        sleep(SETTLE).await;
        assert_eq!(ledger.status(id), OrderState::New);

        ledger.cancel(id).unwrap();
        pipeline.dispatch(ledger.get(id)).unwrap();
        sleep(SETTLE).await;

        assert_eq!(ledger.status(id), OrderState::Cancelled);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (pipeline, _ledger, _events) = harness(MockConnectivity::new());

        assert!(pipeline.start().is_some());
        assert!(pipeline.start().is_none());
        pipeline.stop();
        pipeline.stop();
    }

    #[tokio::test]
    async fn test_stopped_pipeline_accepts_and_delivers_nothing() {
        let mock = MockConnectivity::new(); // no expectations: any call panics
        let (pipeline, ledger, mut events) = harness(mock);
        pipeline.start();
        pipeline.stop();

        let id = ledger.submit(&intent()).unwrap();
        let submitted = events.try_recv().unwrap(); // the submit event itself
        assert_eq!(submitted.order.id, id);

        assert_eq!(pipeline.dispatch(ledger.get(id)), Err(ExecError::NotRunning));
        assert_eq!(
            pipeline.submit_report(ExecutionReport::ack(id, OrderState::New)),
            Err(ExecError::NotRunning)
        );
        sleep(SETTLE).await;

        assert_eq!(ledger.status(id), OrderState::PendingNew);
        assert!(events.try_recv().is_err());
    }
}
