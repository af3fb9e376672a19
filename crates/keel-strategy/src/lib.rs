//! Strategy layer for keel.
//!
//! A `Strategy` consumes market data and order updates and produces
//! order intents; the `StrategyEngine` fans ticks out to every active
//! strategy and collects the intents for the caller to risk-check and
//! submit. Strategies never talk to the ledger or the venue directly.

pub mod engine;
pub mod mean_reversion;
pub mod strategy;

pub use engine::StrategyEngine;
pub use mean_reversion::MeanReversionStrategy;
pub use strategy::Strategy;
