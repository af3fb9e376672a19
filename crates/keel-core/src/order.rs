//! Order lifecycle types.
//!
//! `OrderIntent` is the unvalidated, unrisked candidate produced by a
//! strategy. `Order` is the ledger-owned record with an allocated id.
//! `OrderState` encodes the legal transition graph; every mutation of a
//! stored order goes through `can_transition_to`.

use crate::{InstrumentId, Market, OrderId, Price, Qty};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns 1 for buy, -1 for sell (for signed position calculations).
    pub fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderType {
    /// Whether this order type carries a meaningful price that must
    /// validate as positive. Market orders are exempt.
    pub fn is_priced(&self) -> bool {
        !matches!(self, Self::Market)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Limit => write!(f, "limit"),
            Self::Stop => write!(f, "stop"),
            Self::StopLimit => write!(f, "stop_limit"),
        }
    }
}

/// State of an order in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Accepted by the ledger, not yet acknowledged by the venue.
    #[default]
    PendingNew,
    /// Acknowledged open by the venue.
    New,
    /// Partially filled.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Cancel requested, not yet acknowledged.
    PendingCancel,
    /// Cancel acknowledged.
    Cancelled,
    /// Rejected by validation or venue.
    Rejected,
    /// Expired at the venue.
    Expired,
}

impl OrderState {
    /// Returns true if no further transition is permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::Rejected | Self::Expired
        )
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// The graph:
    /// - `PendingNew -> New`
    /// - `{New, PartiallyFilled} -> PartiallyFilled | Filled | PendingCancel`
    /// - `PendingCancel -> Cancelled`
    /// - any non-terminal `-> Rejected | Expired`
    ///
    /// A repeated cancel request against `PendingCancel` is illegal:
    /// only `New` and `PartiallyFilled` may enter `PendingCancel`.
    pub fn can_transition_to(&self, next: OrderState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            OrderState::Rejected | OrderState::Expired => true,
            OrderState::New => *self == OrderState::PendingNew,
            OrderState::PartiallyFilled | OrderState::Filled => {
                matches!(self, OrderState::New | OrderState::PartiallyFilled)
            }
            OrderState::PendingCancel => {
                matches!(self, OrderState::New | OrderState::PartiallyFilled)
            }
            OrderState::Cancelled => *self == OrderState::PendingCancel,
            OrderState::PendingNew => false,
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingNew => write!(f, "pending_new"),
            Self::New => write!(f, "new"),
            Self::PartiallyFilled => write!(f, "partially_filled"),
            Self::Filled => write!(f, "filled"),
            Self::PendingCancel => write!(f, "pending_cancel"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Rejected => write!(f, "rejected"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// An unvalidated, unrisked candidate order produced by a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Target instrument.
    pub instrument: InstrumentId,
    /// Order type.
    pub kind: OrderType,
    /// Buy or sell.
    pub side: OrderSide,
    /// Limit/stop price; advisory reference price for market orders.
    pub price: Price,
    /// Order quantity.
    pub quantity: Qty,
    /// Target venue.
    pub market: Market,
}

impl OrderIntent {
    /// Create a limit order intent.
    pub fn limit(
        instrument: InstrumentId,
        side: OrderSide,
        price: Price,
        quantity: Qty,
        market: Market,
    ) -> Self {
        Self {
            instrument,
            kind: OrderType::Limit,
            side,
            price,
            quantity,
            market,
        }
    }

    /// Create a market order intent.
    pub fn market(
        instrument: InstrumentId,
        side: OrderSide,
        price: Price,
        quantity: Qty,
        market: Market,
    ) -> Self {
        Self {
            instrument,
            kind: OrderType::Market,
            side,
            price,
            quantity,
            market,
        }
    }

    /// Notional value of the intent: price * quantity.
    pub fn notional(&self) -> rust_decimal::Decimal {
        self.quantity.notional(self.price)
    }
}

/// A single execution: quantity traded against an order at one price.
///
/// Carries the fill delta, not the cumulative filled quantity; position
/// updates consume exactly this amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Quantity traded in this execution.
    pub quantity: Qty,
    /// Execution price.
    pub price: Price,
}

/// An order record, owned exclusively by the ledger for its whole
/// lifecycle. Other components only ever see copies delivered through
/// order-event notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Ledger-allocated identity; 0 marks the invalid sentinel.
    pub id: OrderId,
    /// Target instrument.
    pub instrument: InstrumentId,
    /// Order type.
    pub kind: OrderType,
    /// Buy or sell.
    pub side: OrderSide,
    /// Order price.
    pub price: Price,
    /// Original quantity.
    pub quantity: Qty,
    /// Cumulative filled quantity.
    pub filled_quantity: Qty,
    /// Current lifecycle state.
    pub state: OrderState,
    /// Target venue.
    pub market: Market,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create an order from an accepted intent.
    pub fn from_intent(id: OrderId, intent: &OrderIntent) -> Self {
        Self {
            id,
            instrument: intent.instrument,
            kind: intent.kind,
            side: intent.side,
            price: intent.price,
            quantity: intent.quantity,
            filled_quantity: Qty::ZERO,
            state: OrderState::PendingNew,
            market: intent.market,
            updated_at: Utc::now(),
        }
    }

    /// The distinguished invalid order returned for unknown ids.
    pub fn invalid() -> Self {
        Self {
            id: 0,
            instrument: 0,
            kind: OrderType::Limit,
            side: OrderSide::Buy,
            price: Price::ZERO,
            quantity: Qty::ZERO,
            filled_quantity: Qty::ZERO,
            state: OrderState::Rejected,
            market: Market::Unknown,
            updated_at: Utc::now(),
        }
    }

    /// Remaining unfilled quantity.
    pub fn remaining(&self) -> Qty {
        self.quantity - self.filled_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_sign() {
        assert_eq!(OrderSide::Buy.sign(), 1);
        assert_eq!(OrderSide::Sell.sign(), -1);
    }

    #[test]
    fn test_priced_types() {
        assert!(!OrderType::Market.is_priced());
        assert!(OrderType::Limit.is_priced());
        assert!(OrderType::Stop.is_priced());
        assert!(OrderType::StopLimit.is_priced());
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderState::Filled.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::Rejected.is_terminal());
        assert!(OrderState::Expired.is_terminal());

        assert!(!OrderState::PendingNew.is_terminal());
        assert!(!OrderState::New.is_terminal());
        assert!(!OrderState::PartiallyFilled.is_terminal());
        assert!(!OrderState::PendingCancel.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        use OrderState::*;

        assert!(PendingNew.can_transition_to(New));
        assert!(New.can_transition_to(PartiallyFilled));
        assert!(New.can_transition_to(Filled));
        assert!(New.can_transition_to(PendingCancel));
        assert!(PartiallyFilled.can_transition_to(PartiallyFilled));
        assert!(PartiallyFilled.can_transition_to(Filled));
        assert!(PartiallyFilled.can_transition_to(PendingCancel));
        assert!(PendingCancel.can_transition_to(Cancelled));

        // Any non-terminal state may be rejected or expired.
        for state in [PendingNew, New, PartiallyFilled, PendingCancel] {
            assert!(state.can_transition_to(Rejected));
            assert!(state.can_transition_to(Expired));
        }
    }

    #[test]
    fn test_illegal_transitions() {
        use OrderState::*;

        // Terminal states refuse everything.
        for terminal in [Filled, Cancelled, Rejected, Expired] {
            for next in [PendingNew, New, PartiallyFilled, Filled, PendingCancel, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }

        // A second cancel request against PendingCancel is refused.
        assert!(!PendingCancel.can_transition_to(PendingCancel));
        // Fills cannot bypass the venue acknowledgment.
        assert!(!PendingNew.can_transition_to(Filled));
        assert!(!PendingNew.can_transition_to(PendingCancel));
        // Nothing re-enters PendingNew.
        assert!(!New.can_transition_to(PendingNew));
    }

    #[test]
    fn test_invalid_sentinel() {
        let order = Order::invalid();
        assert_eq!(order.id, 0);
        assert_eq!(order.state, OrderState::Rejected);
    }
}
