//! Order ledger for keel.
//!
//! Single source of truth for order state:
//! - monotonic id allocation (ids start at 1; 0 is the invalid sentinel)
//! - the order store and its lifecycle state machine
//! - submit / cancel / modify / execution-report entry points
//! - a typed order-event channel consumed by the application router
//!
//! The ledger owns every `Order` for its whole lifetime; other components
//! only ever observe snapshots carried by `OrderEvent`.

pub mod error;
pub mod event;
pub mod ledger;

pub use error::LedgerError;
pub use event::{ExecutionReport, OrderEvent};
pub use ledger::OrderLedger;
