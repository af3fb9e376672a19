//! Risk gate for keel.
//!
//! Stateful policy evaluator between strategy signals and the order
//! ledger:
//! - per-instrument position ledger with VWAP cost basis
//! - projected-position, order-notional and order-rate checks
//! - daily PnL / drawdown statistics with an external daily reset

pub mod error;
pub mod gate;
pub mod position;
pub mod rate;

pub use error::RiskViolation;
pub use gate::RiskGate;
pub use position::Position;
pub use rate::RateWindow;
