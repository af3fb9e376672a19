//! The order store and its state machine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error};

use keel_core::{Order, OrderId, OrderIntent, OrderState};

use crate::error::LedgerError;
use crate::event::{ExecutionReport, OrderEvent};

/// Owner of all order records and the only component allowed to mutate
/// them.
///
/// Ids come from a monotonic counter starting at 1 (0 is reserved for
/// the invalid sentinel); ids are never reused and gaps from rejected
/// submissions are fine. Validation runs before id allocation, so a
/// rejected intent consumes nothing.
///
/// Every accepted mutation emits an `OrderEvent` after the store lock is
/// released; subscribers never observe a half-applied change, and the
/// ledger never blocks on a slow subscriber (events are try-sent and a
/// full channel drops with a warning).
pub struct OrderLedger {
    orders: Mutex<HashMap<OrderId, Order>>,
    next_id: AtomicU64,
    submitted: AtomicU64,
    filled: AtomicU64,
    events: mpsc::Sender<OrderEvent>,
}

impl OrderLedger {
    /// Create a ledger emitting events into `events`.
    pub fn new(events: mpsc::Sender<OrderEvent>) -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            submitted: AtomicU64::new(0),
            filled: AtomicU64::new(0),
            events,
        }
    }

    /// Validate and record a new order.
    ///
    /// On success the order enters the store as `PendingNew` and its id
    /// is returned. On validation failure no id is allocated and no
    /// record is created.
    pub fn submit(&self, intent: &OrderIntent) -> Result<OrderId, LedgerError> {
        Self::validate(intent)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let order = Order::from_intent(id, intent);

        self.orders.lock().insert(id, order.clone());
        self.submitted.fetch_add(1, Ordering::Relaxed);

        debug!(
            order_id = id,
            instrument = order.instrument,
            side = %order.side,
            quantity = %order.quantity,
            "order submitted"
        );
        self.emit(OrderEvent { order, fill: None });
        Ok(id)
    }

    /// Request cancellation: `New`/`PartiallyFilled` move to
    /// `PendingCancel`. A repeated cancel while already `PendingCancel`
    /// is an illegal transition, as is cancelling a terminal order.
    pub fn cancel(&self, id: OrderId) -> Result<(), LedgerError> {
        let snapshot = {
            let mut orders = self.orders.lock();
            let order = orders.get_mut(&id).ok_or(LedgerError::NotFound { id })?;

            if !order.state.can_transition_to(OrderState::PendingCancel) {
                return Err(LedgerError::IllegalTransition {
                    id,
                    from: order.state,
                    to: OrderState::PendingCancel,
                });
            }
            order.state = OrderState::PendingCancel;
            order.updated_at = Utc::now();
            order.clone()
        };

        debug!(order_id = id, "cancel requested");
        self.emit(OrderEvent {
            order: snapshot,
            fill: None,
        });
        Ok(())
    }

    /// Replace type, price and quantity of a non-terminal order. The
    /// replacement values are validated like a fresh submission.
    pub fn modify(&self, id: OrderId, intent: &OrderIntent) -> Result<(), LedgerError> {
        Self::validate(intent)?;

        let snapshot = {
            let mut orders = self.orders.lock();
            let order = orders.get_mut(&id).ok_or(LedgerError::NotFound { id })?;

            if order.state.is_terminal() {
                return Err(LedgerError::Terminal {
                    id,
                    state: order.state,
                });
            }
            order.kind = intent.kind;
            order.price = intent.price;
            order.quantity = intent.quantity;
            order.updated_at = Utc::now();
            order.clone()
        };

        debug!(order_id = id, "order modified");
        self.emit(OrderEvent {
            order: snapshot,
            fill: None,
        });
        Ok(())
    }

    /// Apply an inbound execution report: validate the transition, fold
    /// in any fill, and notify.
    pub fn apply_execution(&self, report: &ExecutionReport) -> Result<(), LedgerError> {
        let id = report.order_id;
        let snapshot = {
            let mut orders = self.orders.lock();
            let order = orders.get_mut(&id).ok_or(LedgerError::NotFound { id })?;

            if !order.state.can_transition_to(report.state) {
                return Err(LedgerError::IllegalTransition {
                    id,
                    from: order.state,
                    to: report.state,
                });
            }
            if let Some(fill) = &report.fill {
                if fill.quantity.inner() > order.remaining().inner() {
                    return Err(LedgerError::Validation {
                        reason: "fill exceeds remaining quantity",
                    });
                }
                order.filled_quantity = order.filled_quantity + fill.quantity;
            }
            order.state = report.state;
            order.updated_at = Utc::now();
            order.clone()
        };

        if report.state == OrderState::Filled {
            self.filled.fetch_add(1, Ordering::Relaxed);
        }
        debug!(order_id = id, state = %report.state, "execution applied");
        self.emit(OrderEvent {
            order: snapshot,
            fill: report.fill,
        });
        Ok(())
    }

    /// Current state of an order; unknown ids report `Rejected` (the
    /// invalid sentinel's state).
    pub fn status(&self, id: OrderId) -> OrderState {
        self.orders
            .lock()
            .get(&id)
            .map(|o| o.state)
            .unwrap_or_else(|| Order::invalid().state)
    }

    /// Snapshot of an order; unknown ids yield the distinguished
    /// invalid order (id 0), never a panic.
    pub fn get(&self, id: OrderId) -> Order {
        self.orders
            .lock()
            .get(&id)
            .cloned()
            .unwrap_or_else(Order::invalid)
    }

    /// Number of orders accepted by `submit`.
    pub fn orders_submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Number of orders that reached `Filled`.
    pub fn orders_filled(&self) -> u64 {
        self.filled.load(Ordering::Relaxed)
    }

    fn validate(intent: &OrderIntent) -> Result<(), LedgerError> {
        if intent.instrument == 0 {
            return Err(LedgerError::Validation {
                reason: "instrument id must be non-zero",
            });
        }
        if !intent.quantity.is_positive() {
            return Err(LedgerError::Validation {
                reason: "quantity must be positive",
            });
        }
        if intent.kind.is_priced() && !intent.price.is_positive() {
            return Err(LedgerError::Validation {
                reason: "price must be positive for priced order types",
            });
        }
        Ok(())
    }

    /// Best-effort notification: a full channel drops the event rather
    /// than block the mutation path. A dropped fill event leaves
    /// subscriber state (positions, strategy in-flight tracking) stale
    /// relative to the ledger until a later event, so the channel must
    /// be sized for the router's worst-case lag.
    fn emit(&self, event: OrderEvent) {
        if let Err(err) = self.events.try_send(event) {
            error!(%err, "order event dropped; subscriber state may be stale");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{Fill, Market, OrderSide, Price, Qty};
    use rust_decimal_macros::dec;

    fn ledger() -> (OrderLedger, mpsc::Receiver<OrderEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (OrderLedger::new(tx), rx)
    }

    fn intent() -> OrderIntent {
        OrderIntent::limit(
            7,
            OrderSide::Buy,
            Price::new(dec!(100)),
            Qty::new(dec!(10)),
            Market::UsaNasdaq,
        )
    }

    #[tokio::test]
    async fn test_submit_allocates_unique_monotonic_ids() {
        let (ledger, _rx) = ledger();

        let a = ledger.submit(&intent()).unwrap();
        let b = ledger.submit(&intent()).unwrap();
        let c = ledger.submit(&intent()).unwrap();

        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(ledger.orders_submitted(), 3);
    }

    #[tokio::test]
    async fn test_rejected_submit_consumes_no_id() {
        let (ledger, mut rx) = ledger();

        let mut bad = intent();
        bad.quantity = Qty::ZERO;
        assert_eq!(
            ledger.submit(&bad),
            Err(LedgerError::Validation {
                reason: "quantity must be positive",
            })
        );

        let mut no_instrument = intent();
        no_instrument.instrument = 0;
        assert!(ledger.submit(&no_instrument).is_err());

        let mut free_limit = intent();
        free_limit.price = Price::ZERO;
        assert!(ledger.submit(&free_limit).is_err());

        // First valid submission still gets id 1, and the rejections
        // emitted no events.
        assert_eq!(ledger.submit(&intent()).unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap().order.id, 1);
    }

    #[tokio::test]
    async fn test_market_orders_skip_price_validation() {
        let (ledger, _rx) = ledger();

        let market = OrderIntent::market(
            7,
            OrderSide::Sell,
            Price::ZERO,
            Qty::new(dec!(5)),
            Market::HongKong,
        );
        assert!(ledger.submit(&market).is_ok());
    }

    #[tokio::test]
    async fn test_cancel_path_and_second_cancel_rejected() {
        let (ledger, _rx) = ledger();
        let id = ledger.submit(&intent()).unwrap();

        ledger
            .apply_execution(&ExecutionReport::ack(id, OrderState::New))
            .unwrap();
        ledger.cancel(id).unwrap();
        assert_eq!(ledger.status(id), OrderState::PendingCancel);

        // A second cancel while the first is pending is illegal.
        assert_eq!(
            ledger.cancel(id),
            Err(LedgerError::IllegalTransition {
                id,
                from: OrderState::PendingCancel,
                to: OrderState::PendingCancel,
            })
        );

        ledger
            .apply_execution(&ExecutionReport::ack(id, OrderState::Cancelled))
            .unwrap();
        assert_eq!(ledger.status(id), OrderState::Cancelled);
    }

    #[tokio::test]
    async fn test_terminal_orders_refuse_cancel_and_modify() {
        let (ledger, _rx) = ledger();
        let id = ledger.submit(&intent()).unwrap();

        ledger
            .apply_execution(&ExecutionReport::ack(id, OrderState::New))
            .unwrap();
        let fill = Fill {
            quantity: Qty::new(dec!(10)),
            price: Price::new(dec!(100)),
        };
        ledger
            .apply_execution(&ExecutionReport::fill(id, OrderState::Filled, fill))
            .unwrap();

        assert!(ledger.cancel(id).is_err());
        assert_eq!(
            ledger.modify(id, &intent()),
            Err(LedgerError::Terminal {
                id,
                state: OrderState::Filled,
            })
        );
        // State untouched by the rejected mutations.
        assert_eq!(ledger.status(id), OrderState::Filled);
        assert_eq!(ledger.orders_filled(), 1);
    }

    #[tokio::test]
    async fn test_partial_fills_accumulate_and_overfill_rejected() {
        let (ledger, _rx) = ledger();
        let id = ledger.submit(&intent()).unwrap();
        ledger
            .apply_execution(&ExecutionReport::ack(id, OrderState::New))
            .unwrap();

        let part = Fill {
            quantity: Qty::new(dec!(4)),
            price: Price::new(dec!(100)),
        };
        ledger
            .apply_execution(&ExecutionReport::fill(id, OrderState::PartiallyFilled, part))
            .unwrap();
        assert_eq!(ledger.get(id).filled_quantity, Qty::new(dec!(4)));
        assert_eq!(ledger.get(id).remaining(), Qty::new(dec!(6)));

        let too_much = Fill {
            quantity: Qty::new(dec!(7)),
            price: Price::new(dec!(100)),
        };
        assert_eq!(
            ledger.apply_execution(&ExecutionReport::fill(
                id,
                OrderState::Filled,
                too_much
            )),
            Err(LedgerError::Validation {
                reason: "fill exceeds remaining quantity",
            })
        );
        // The rejected overfill left the order untouched.
        assert_eq!(ledger.status(id), OrderState::PartiallyFilled);
        assert_eq!(ledger.get(id).filled_quantity, Qty::new(dec!(4)));
    }

    #[tokio::test]
    async fn test_fill_cannot_bypass_acknowledgment() {
        let (ledger, _rx) = ledger();
        let id = ledger.submit(&intent()).unwrap();

        let fill = Fill {
            quantity: Qty::new(dec!(10)),
            price: Price::new(dec!(100)),
        };
        assert_eq!(
            ledger.apply_execution(&ExecutionReport::fill(id, OrderState::Filled, fill)),
            Err(LedgerError::IllegalTransition {
                id,
                from: OrderState::PendingNew,
                to: OrderState::Filled,
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_id_yields_invalid_sentinel() {
        let (ledger, _rx) = ledger();

        assert_eq!(ledger.cancel(99), Err(LedgerError::NotFound { id: 99 }));
        assert_eq!(ledger.status(99), OrderState::Rejected);
        assert_eq!(ledger.get(99).id, 0);
    }

    #[tokio::test]
    async fn test_full_event_channel_does_not_block_mutations() {
        let (tx, mut rx) = mpsc::channel(1);
        let ledger = OrderLedger::new(tx);

        let a = ledger.submit(&intent()).unwrap();
        // Second event has nowhere to go; the mutation still lands.
        let b = ledger.submit(&intent()).unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(ledger.status(2), OrderState::PendingNew);

        assert_eq!(rx.recv().await.unwrap().order.id, 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_events_carry_snapshots_and_fill_deltas() {
        let (ledger, mut rx) = ledger();
        let id = ledger.submit(&intent()).unwrap();
        ledger
            .apply_execution(&ExecutionReport::ack(id, OrderState::New))
            .unwrap();
        let fill = Fill {
            quantity: Qty::new(dec!(3)),
            price: Price::new(dec!(101)),
        };
        ledger
            .apply_execution(&ExecutionReport::fill(id, OrderState::PartiallyFilled, fill))
            .unwrap();

        let submitted = rx.recv().await.unwrap();
        assert_eq!(submitted.order.state, OrderState::PendingNew);
        assert!(submitted.fill.is_none());

        let acked = rx.recv().await.unwrap();
        assert_eq!(acked.order.state, OrderState::New);

        let filled = rx.recv().await.unwrap();
        assert_eq!(filled.order.state, OrderState::PartiallyFilled);
        assert_eq!(filled.order.filled_quantity, Qty::new(dec!(3)));
        assert_eq!(filled.fill.unwrap().quantity, Qty::new(dec!(3)));
    }
}
