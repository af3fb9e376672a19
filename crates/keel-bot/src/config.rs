//! Application configuration.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AppResult;
use keel_core::{InstrumentId, Market, RiskLimits};

/// Feed layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Advisory capacity of the tick staging queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Capacity of the tick dispatch channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_queue_capacity() -> usize {
    4096
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Mean-reversion strategy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Instrument the strategy trades.
    #[serde(default = "default_instrument")]
    pub instrument: InstrumentId,
    /// Venue orders are routed to.
    #[serde(default = "default_market")]
    pub market: Market,
    /// Mid-price window length.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Fractional deviation from the mean that triggers a signal.
    #[serde(default = "default_threshold")]
    pub threshold: Decimal,
    /// Quantity per order.
    #[serde(default = "default_order_qty")]
    pub order_qty: Decimal,
}

fn default_instrument() -> InstrumentId {
    1
}

fn default_market() -> Market {
    Market::UsaNyse
}

fn default_window_size() -> usize {
    20
}

fn default_threshold() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

fn default_order_qty() -> Decimal {
    Decimal::from(10)
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            instrument: default_instrument(),
            market: default_market(),
            window_size: default_window_size(),
            threshold: default_threshold(),
            order_qty: default_order_qty(),
        }
    }
}

/// A venue session to establish at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    pub market: Market,
    pub endpoint: String,
    #[serde(default)]
    pub credentials: String,
}

/// Top-level application configuration.
///
/// An explicit value passed into every constructor that needs it; there
/// is no global configuration state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: RiskLimits,
    #[serde(default)]
    pub venues: Vec<VenueConfig>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Load from a file, falling back to defaults when it is missing.
    pub fn load_or_default(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Venue sessions to establish; defaults to a simulated session on
    /// the strategy's market when none are configured.
    pub fn venue_sessions(&self) -> Vec<VenueConfig> {
        if self.venues.is_empty() {
            vec![VenueConfig {
                market: self.strategy.market,
                endpoint: format!("sim://{}", self.strategy.market),
                credentials: String::new(),
            }]
        } else {
            self.venues.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.feed.queue_capacity, 4096);
        assert_eq!(config.strategy.window_size, 20);
        assert_eq!(config.strategy.threshold, dec!(0.02));
        assert_eq!(config.risk.max_orders_per_second, 100);
        assert!(config.venues.is_empty());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [strategy]
            instrument = 7
            market = "hong_kong"

            [risk]
            max_position_size = "2500"
            "#,
        )
        .unwrap();

        assert_eq!(config.strategy.instrument, 7);
        assert_eq!(config.strategy.market, Market::HongKong);
        assert_eq!(config.strategy.window_size, 20);
        assert_eq!(config.risk.max_position_size, dec!(2500));
        assert_eq!(config.risk.max_order_value, dec!(50000));
    }

    #[test]
    fn test_default_venue_session_follows_strategy_market() {
        let config = AppConfig::default();
        let sessions = config.venue_sessions();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].market, Market::UsaNyse);
    }
}
