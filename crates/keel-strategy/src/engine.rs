//! Strategy dispatch.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info};

use keel_core::{Order, OrderIntent, Tick};

use crate::strategy::Strategy;

/// Fan-out dispatcher over registered strategies.
///
/// Registration is append-only; dispatch happens in registration order.
/// `process_tick` collects intents under the lock and returns them to
/// the caller, which submits them after the lock is gone; strategies
/// never re-enter the engine from inside a dispatch call.
pub struct StrategyEngine {
    strategies: Mutex<Vec<Box<dyn Strategy>>>,
    running: AtomicBool,
}

impl Default for StrategyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyEngine {
    pub fn new() -> Self {
        Self {
            strategies: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Add a strategy. There is no unregister.
    pub fn register(&self, strategy: Box<dyn Strategy>) {
        info!(strategy = strategy.name(), "strategy registered");
        self.strategies.lock().push(strategy);
    }

    /// Enable dispatch. Idempotent; returns false when already running.
    pub fn start(&self) -> bool {
        let started = !self.running.swap(true, Ordering::SeqCst);
        if started {
            info!("strategy engine started");
        }
        started
    }

    /// Disable dispatch. Idempotent.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("strategy engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Dispatch a tick to every active strategy and collect the intents
    /// they generate. Returns empty when the engine is stopped.
    pub fn process_tick(&self, tick: &Tick) -> Vec<OrderIntent> {
        if !self.is_running() {
            return Vec::new();
        }

        let mut intents = Vec::new();
        let mut strategies = self.strategies.lock();
        for strategy in strategies.iter_mut() {
            if !strategy.is_active() {
                continue;
            }
            strategy.on_tick(tick);
            let signals = strategy.generate_signals();
            if !signals.is_empty() {
                debug!(
                    strategy = strategy.name(),
                    count = signals.len(),
                    "signals generated"
                );
            }
            intents.extend(signals);
        }
        intents
    }

    /// Dispatch an order update to every active strategy.
    pub fn process_order_update(&self, order: &Order) {
        if !self.is_running() {
            return;
        }
        let mut strategies = self.strategies.lock();
        for strategy in strategies.iter_mut() {
            if strategy.is_active() {
                strategy.on_order_update(order);
            }
        }
    }

    /// Number of strategies currently reporting active.
    pub fn active_count(&self) -> usize {
        self.strategies
            .lock()
            .iter()
            .filter(|s| s.is_active())
            .count()
    }

    /// Whether a strategy with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.lock().iter().any(|s| s.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::{Market, OrderSide, Price, Qty};
    use rust_decimal_macros::dec;

    /// Scripted strategy that records dispatches and returns one canned
    /// intent per tick.
    struct Probe {
        name: String,
        active: bool,
        ticks_seen: usize,
        updates_seen: usize,
    }

    impl Probe {
        fn new(name: &str, active: bool) -> Self {
            Self {
                name: name.to_string(),
                active,
                ticks_seen: 0,
                updates_seen: 0,
            }
        }
    }

    impl Strategy for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn on_tick(&mut self, _tick: &Tick) {
            self.ticks_seen += 1;
        }

        fn on_order_update(&mut self, _order: &Order) {
            self.updates_seen += 1;
        }

        fn generate_signals(&mut self) -> Vec<OrderIntent> {
            vec![OrderIntent::limit(
                1,
                OrderSide::Buy,
                Price::new(dec!(10)),
                Qty::new(dec!(1)),
                Market::UsaNyse,
            )]
        }
    }

    fn tick() -> Tick {
        Tick::new(
            1,
            Price::new(dec!(99)),
            Qty::new(dec!(100)),
            Price::new(dec!(101)),
            Qty::new(dec!(100)),
        )
    }

    #[test]
    fn test_collects_intents_from_active_strategies_only() {
        let engine = StrategyEngine::new();
        engine.register(Box::new(Probe::new("alpha", true)));
        engine.register(Box::new(Probe::new("idle", false)));
        engine.register(Box::new(Probe::new("beta", true)));
        engine.start();

        let intents = engine.process_tick(&tick());
        assert_eq!(intents.len(), 2);
        assert_eq!(engine.active_count(), 2);
    }

    #[test]
    fn test_stopped_engine_dispatches_nothing() {
        let engine = StrategyEngine::new();
        engine.register(Box::new(Probe::new("alpha", true)));

        assert!(engine.process_tick(&tick()).is_empty());

        engine.start();
        engine.stop();
        assert!(engine.process_tick(&tick()).is_empty());
    }

    #[test]
    fn test_start_is_idempotent() {
        let engine = StrategyEngine::new();
        assert!(engine.start());
        assert!(!engine.start());
        assert!(engine.is_running());
    }

    #[test]
    fn test_lookup_by_name() {
        let engine = StrategyEngine::new();
        engine.register(Box::new(Probe::new("alpha", true)));

        assert!(engine.contains("alpha"));
        assert!(!engine.contains("gamma"));
    }
}
