//! The risk gate: order checks and the position ledger.

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};

use keel_core::{Clock, Fill, InstrumentId, Order, OrderIntent, OrderState, RiskLimits, SystemClock};

use crate::error::RiskViolation;
use crate::position::Position;
use crate::rate::RateWindow;

#[derive(Debug, Default)]
struct DailyStats {
    /// Realized PnL since the last daily reset.
    daily_pnl: Decimal,
    /// Highest portfolio value observed (not reset daily).
    peak_value: Decimal,
    /// Current drop from the peak.
    drawdown: Decimal,
}

/// Stateful policy evaluator between strategy signals and the ledger.
///
/// Sole mutator of position state. Limits are an immutable snapshot
/// supplied once at construction. `check_order` evaluates independent,
/// order-commutative checks and short-circuits on the first failure; the
/// decision observes only state already committed when it runs.
pub struct RiskGate<C: Clock = SystemClock> {
    limits: RiskLimits,
    positions: DashMap<InstrumentId, Position>,
    rate: RateWindow<C>,
    daily: Mutex<DailyStats>,
}

impl RiskGate<SystemClock> {
    /// Create a gate on the system clock.
    pub fn new(limits: RiskLimits) -> Self {
        Self::with_clock(limits, SystemClock)
    }
}

impl<C: Clock> RiskGate<C> {
    /// Create a gate with an injected clock (tests drive the rate window
    /// without sleeping).
    pub fn with_clock(limits: RiskLimits, clock: C) -> Self {
        let rate = RateWindow::new(clock, limits.max_orders_per_second);
        Self {
            limits,
            positions: DashMap::new(),
            rate,
            daily: Mutex::new(DailyStats::default()),
        }
    }

    /// Evaluate an order intent against every limit.
    ///
    /// Check order: projected position size, order notional, order rate.
    /// The returned violation is the first check that failed.
    pub fn check_order(&self, intent: &OrderIntent) -> Result<(), RiskViolation> {
        self.check_position_size(intent)?;
        self.check_order_value(intent)?;
        self.check_order_rate()?;
        Ok(())
    }

    /// Projection check: what the position would become if the order
    /// fully filled. Rejects upfront; partial fills are not re-evaluated
    /// mid-flight. Exactly at the limit is accepted.
    fn check_position_size(&self, intent: &OrderIntent) -> Result<(), RiskViolation> {
        let current = self
            .positions
            .get(&intent.instrument)
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO);

        let projected = current + Decimal::from(intent.side.sign()) * intent.quantity.inner();

        if projected.abs() > self.limits.max_position_size {
            debug!(
                instrument = intent.instrument,
                %projected,
                limit = %self.limits.max_position_size,
                "risk check failed: position size"
            );
            return Err(RiskViolation::PositionSize {
                projected,
                limit: self.limits.max_position_size,
            });
        }
        Ok(())
    }

    fn check_order_value(&self, intent: &OrderIntent) -> Result<(), RiskViolation> {
        let notional = intent.notional();
        if notional > self.limits.max_order_value {
            debug!(
                instrument = intent.instrument,
                %notional,
                limit = %self.limits.max_order_value,
                "risk check failed: order value"
            );
            return Err(RiskViolation::OrderValue {
                notional,
                limit: self.limits.max_order_value,
            });
        }
        Ok(())
    }

    fn check_order_rate(&self) -> Result<(), RiskViolation> {
        if !self.rate.try_acquire() {
            debug!(
                limit = self.limits.max_orders_per_second,
                "risk check failed: order rate"
            );
            return Err(RiskViolation::OrderRate {
                limit: self.limits.max_orders_per_second,
            });
        }
        Ok(())
    }

    /// Apply a fill notification to the position ledger.
    ///
    /// Only `Filled` and `PartiallyFilled` order snapshots mutate state;
    /// anything else is ignored. The fill carries the execution delta,
    /// not the order's cumulative filled quantity.
    pub fn update_position(&self, order: &Order, fill: &Fill) {
        if !matches!(
            order.state,
            OrderState::Filled | OrderState::PartiallyFilled
        ) {
            return;
        }

        let realized = {
            let mut position = self
                .positions
                .entry(order.instrument)
                .or_insert_with(|| Position::flat(order.instrument));
            position.apply_fill(order.side, fill.quantity, fill.price)
        };

        let total = self.total_value();
        let mut daily = self.daily.lock();
        daily.daily_pnl += realized;
        if total > daily.peak_value {
            daily.peak_value = total;
        }
        daily.drawdown = daily.peak_value - total;
    }

    /// Snapshot of the position for an instrument. A never-seen
    /// instrument yields a zeroed position, never a missing value.
    pub fn position(&self, instrument: InstrumentId) -> Position {
        self.positions
            .get(&instrument)
            .map(|p| p.clone())
            .unwrap_or_else(|| Position::flat(instrument))
    }

    /// Whether a position is within the size limit.
    pub fn check_position(&self, position: &Position) -> bool {
        position.quantity.abs() <= self.limits.max_position_size
    }

    /// Whether realized daily losses are within the limit.
    pub fn daily_loss_ok(&self) -> bool {
        self.daily.lock().daily_pnl.abs() <= self.limits.max_daily_loss
    }

    /// Whether the drawdown from peak is within the limit.
    pub fn drawdown_ok(&self) -> bool {
        self.daily.lock().drawdown.abs() <= self.limits.max_drawdown
    }

    /// Realized PnL accumulated since the last daily reset.
    pub fn daily_pnl(&self) -> Decimal {
        self.daily.lock().daily_pnl
    }

    /// Total portfolio value at average entry prices.
    pub fn total_value(&self) -> Decimal {
        self.positions.iter().map(|p| p.notional()).sum()
    }

    /// Zero daily PnL, drawdown and the order-rate window. Triggered by
    /// an external daily boundary; scheduling lives with the caller.
    pub fn reset_daily_stats(&self) {
        {
            let mut daily = self.daily.lock();
            daily.daily_pnl = Decimal::ZERO;
            daily.drawdown = Decimal::ZERO;
        }
        self.rate.reset();
        info!("daily risk statistics reset");
    }
}
