//! The strategy capability contract.

use keel_core::{Order, OrderIntent, Tick};

/// A trading strategy.
///
/// The engine drives every method from its dispatch thread, so
/// implementations hold plain mutable state and need no internal
/// locking. Intents returned from `generate_signals` are candidates
/// only; the risk gate decides whether they become orders, and the
/// outcome comes back through `on_order_update`.
pub trait Strategy: Send {
    /// Stable display name, unique within an engine.
    fn name(&self) -> &str;

    /// Whether the engine should dispatch to this strategy at all.
    fn is_active(&self) -> bool;

    /// Observe one market-data tick.
    fn on_tick(&mut self, tick: &Tick);

    /// Observe a lifecycle change on an order (including orders the
    /// strategy did not originate).
    fn on_order_update(&mut self, order: &Order);

    /// Produce candidate orders based on state accumulated so far.
    fn generate_signals(&mut self) -> Vec<OrderIntent>;
}
