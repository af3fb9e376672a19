//! Core domain types for the keel trading core.
//!
//! This crate provides the fundamental types shared by every component:
//! - `Price`, `Qty`: precision-safe numeric types
//! - `Tick`: bid/ask market-data snapshot
//! - `Order`, `OrderIntent`, `OrderState`: order lifecycle types
//! - `RiskLimits`: immutable risk configuration record
//! - `Clock`: injectable time source

pub mod clock;
pub mod decimal;
pub mod limits;
pub mod order;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use decimal::{Price, Qty};
pub use limits::RiskLimits;
pub use order::{Fill, Order, OrderIntent, OrderSide, OrderState, OrderType};
pub use types::{InstrumentId, Market, OrderId, Tick};
