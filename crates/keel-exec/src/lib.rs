//! Execution layer for keel.
//!
//! The dispatch pipeline sits between the order ledger and venue
//! connectivity: an outbound queue of order snapshots awaiting wire
//! dispatch and an inbound queue of execution reports flowing back into
//! the ledger, each drained by its own worker task. The `Connectivity`
//! trait is the seam for real venue adapters; `SimVenue` is the bundled
//! simulation.

pub mod connectivity;
pub mod error;
pub mod pipeline;

pub use connectivity::{Connectivity, SimVenue};
pub use error::ExecError;
pub use pipeline::ExecutionPipeline;
