//! Per-instrument signed position with VWAP cost basis.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use keel_core::{InstrumentId, OrderSide, Price, Qty};

/// Net signed holding and weighted-average cost basis for one instrument.
///
/// Quantity is signed: positive = long, negative = short. A never-traded
/// instrument is represented by `Position::flat`, not by absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument this position is in.
    pub instrument: InstrumentId,
    /// Signed net quantity (positive = long).
    pub quantity: Decimal,
    /// Volume-weighted average entry price; zero while flat.
    pub average_price: Decimal,
    /// Realized PnL from position-reducing fills.
    pub realized_pnl: Decimal,
    /// Unrealized PnL at the last mark (zero until marked).
    pub unrealized_pnl: Decimal,
    /// Timestamp of the last fill applied.
    pub last_update: DateTime<Utc>,
}

impl Position {
    /// A zeroed position for an instrument with no trading history.
    pub fn flat(instrument: InstrumentId) -> Self {
        Self {
            instrument,
            quantity: Decimal::ZERO,
            average_price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            last_update: Utc::now(),
        }
    }

    /// Whether the net quantity is zero.
    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Absolute notional at the average entry price.
    pub fn notional(&self) -> Decimal {
        self.quantity.abs() * self.average_price
    }

    /// Apply one fill and return the realized PnL of any reducing portion.
    ///
    /// Signed quantity update: `+qty` for buys, `-qty` for sells. Average
    /// price follows `new_avg = (old_avg * old_qty + price * delta) /
    /// new_qty`; when the fill takes the net quantity through zero the
    /// average resets to zero (flat) or to the fill price (side flip).
    pub fn apply_fill(&mut self, side: OrderSide, fill_qty: Qty, fill_price: Price) -> Decimal {
        let delta = Decimal::from(side.sign()) * fill_qty.inner();
        let old_qty = self.quantity;
        let new_qty = old_qty + delta;
        let price = fill_price.inner();

        // Realized PnL on the portion that offsets the existing position.
        let mut realized = Decimal::ZERO;
        if !old_qty.is_zero() && old_qty.signum() != delta.signum() {
            let closed = delta.abs().min(old_qty.abs());
            realized = closed * (price - self.average_price) * old_qty.signum();
            self.realized_pnl += realized;
        }

        if new_qty.is_zero() {
            self.average_price = Decimal::ZERO;
        } else if old_qty.signum() * new_qty.signum() < Decimal::ZERO {
            // Crossed through zero: the surviving quantity was opened here.
            self.average_price = price;
        } else if delta.signum() == new_qty.signum() {
            // Same-direction increase: volume-weighted average.
            self.average_price = (self.average_price * old_qty + price * delta) / new_qty;
        }
        // A pure reduction leaves the cost basis untouched.

        self.quantity = new_qty;
        self.last_update = Utc::now();
        realized
    }
}
