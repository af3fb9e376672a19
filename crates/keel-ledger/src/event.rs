//! Typed order notifications and execution reports.

use keel_core::{Fill, Order, OrderId, OrderState};
use serde::{Deserialize, Serialize};

/// Notification emitted by the ledger after every accepted mutation.
///
/// Carries a full snapshot of the order after the change, plus the fill
/// delta when the mutation was an execution. Emitted strictly outside
/// the ledger's lock, in mutation order per order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Order snapshot after the mutation.
    pub order: Order,
    /// Execution delta, present only for fill events.
    pub fill: Option<Fill>,
}

/// Inbound state report from the execution layer (venue or simulated
/// acknowledgment path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Ledger id of the order this report is for.
    pub order_id: OrderId,
    /// State the venue moved the order to.
    pub state: OrderState,
    /// Executed quantity and price, for fill reports.
    pub fill: Option<Fill>,
}

impl ExecutionReport {
    /// A pure state acknowledgment with no execution attached.
    pub fn ack(order_id: OrderId, state: OrderState) -> Self {
        Self {
            order_id,
            state,
            fill: None,
        }
    }

    /// A fill report.
    pub fn fill(order_id: OrderId, state: OrderState, fill: Fill) -> Self {
        Self {
            order_id,
            state,
            fill: Some(fill),
        }
    }
}
