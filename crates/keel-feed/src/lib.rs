//! Market data ingestion for keel.
//!
//! - `TickQueue`: bounded single-producer/single-consumer staging queue
//!   between the market feed and the strategy dispatcher
//! - `FeedHandler`: subscription filtering and the consumer worker that
//!   forwards ticks into the dispatch channel

pub mod handler;
pub mod queue;

pub use handler::FeedHandler;
pub use queue::TickQueue;
