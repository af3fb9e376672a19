//! Illustrative mean-reversion strategy.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use tracing::debug;

use keel_core::{InstrumentId, Market, Order, OrderId, OrderIntent, OrderSide, Price, Qty, Tick};

use crate::strategy::Strategy;

/// Fades deviations of the mid price from its rolling mean.
///
/// Keeps a bounded FIFO window of mid prices for one instrument. When
/// the window is full and the latest mid deviates from the arithmetic
/// mean by more than `threshold` (fractional), it emits one limit
/// intent against the deviation: buy below the mean, sell above it.
/// At most one order is in flight at a time; the slot frees when the
/// tracked order reaches a terminal state.
pub struct MeanReversionStrategy {
    name: String,
    instrument: InstrumentId,
    market: Market,
    window: VecDeque<Decimal>,
    window_size: usize,
    threshold: Decimal,
    order_qty: Qty,
    active: bool,
    last_mid: Option<Decimal>,
    /// Id of the order currently in flight. `Some(0)` marks a signal
    /// that was emitted but whose ledger id has not come back yet.
    in_flight: Option<OrderId>,
}

impl MeanReversionStrategy {
    pub fn new(
        instrument: InstrumentId,
        market: Market,
        window_size: usize,
        threshold: Decimal,
        order_qty: Qty,
    ) -> Self {
        Self {
            name: format!("mean_reversion_{instrument}"),
            instrument,
            market,
            window: VecDeque::with_capacity(window_size),
            window_size,
            threshold,
            order_qty,
            active: true,
            last_mid: None,
            in_flight: None,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn mean(&self) -> Decimal {
        let sum: Decimal = self.window.iter().sum();
        sum / Decimal::from(self.window.len())
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn on_tick(&mut self, tick: &Tick) {
        if tick.instrument != self.instrument {
            return;
        }
        let Some(mid) = tick.mid() else {
            return;
        };
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(mid.inner());
        self.last_mid = Some(mid.inner());
    }

    fn on_order_update(&mut self, order: &Order) {
        if order.instrument != self.instrument {
            return;
        }
        match self.in_flight {
            // Adopt the ledger id once the submission event arrives.
            Some(0) if !order.state.is_terminal() => {
                self.in_flight = Some(order.id);
            }
            Some(id) if id == 0 || id == order.id => {
                if order.state.is_terminal() {
                    debug!(
                        strategy = self.name,
                        order_id = order.id,
                        state = %order.state,
                        "in-flight order settled"
                    );
                    self.in_flight = None;
                }
            }
            _ => {}
        }
    }

    fn generate_signals(&mut self) -> Vec<OrderIntent> {
        if self.in_flight.is_some() || self.window.len() < self.window_size {
            return Vec::new();
        }
        let Some(mid) = self.last_mid else {
            return Vec::new();
        };

        let mean = self.mean();
        if mean.is_zero() {
            return Vec::new();
        }
        let deviation = (mid - mean) / mean;
        if deviation.abs() <= self.threshold {
            return Vec::new();
        }

        let side = if deviation < Decimal::ZERO {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        debug!(
            strategy = self.name,
            %mid,
            %mean,
            %deviation,
            %side,
            "mean-reversion signal"
        );
        self.in_flight = Some(0);
        vec![OrderIntent::limit(
            self.instrument,
            side,
            Price::new(mid),
            self.order_qty,
            self.market,
        )]
    }
}
