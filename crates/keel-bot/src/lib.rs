//! keel application crate: configuration, logging and component wiring.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;

pub use app::Application;
pub use config::{AppConfig, FeedConfig, StrategyConfig, VenueConfig};
pub use error::{AppError, AppResult};
pub use logging::init_logging;
