//! Ledger failure modes.

use keel_core::{OrderId, OrderState};
use thiserror::Error;

/// A rejected ledger operation. All variants are recoverable: the order
/// store is left exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Intent failed validation. No id was consumed, no record created.
    #[error("order validation failed: {reason}")]
    Validation { reason: &'static str },

    /// No order with this id exists in the ledger.
    #[error("unknown order id {id}")]
    NotFound { id: OrderId },

    /// The requested state change violates the lifecycle graph.
    #[error("illegal transition {from} -> {to} for order {id}")]
    IllegalTransition {
        id: OrderId,
        from: OrderState,
        to: OrderState,
    },

    /// The order is in a terminal state and refuses all mutation.
    #[error("order {id} is terminal ({state})")]
    Terminal { id: OrderId, state: OrderState },
}
