//! Risk limit configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Immutable risk configuration snapshot, supplied once at initialization
/// and held by the risk gate for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum absolute signed position per instrument.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,
    /// Maximum absolute daily realized loss.
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
    /// Maximum notional value of a single order.
    #[serde(default = "default_max_order_value")]
    pub max_order_value: Decimal,
    /// Maximum drawdown from the portfolio peak.
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: Decimal,
    /// Maximum orders admitted per one-second window.
    #[serde(default = "default_max_orders_per_second")]
    pub max_orders_per_second: u32,
}

fn default_max_position_size() -> Decimal {
    dec!(10000)
}

fn default_max_daily_loss() -> Decimal {
    dec!(100000)
}

fn default_max_order_value() -> Decimal {
    dec!(50000)
}

fn default_max_drawdown() -> Decimal {
    dec!(50000)
}

fn default_max_orders_per_second() -> u32 {
    100
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: default_max_position_size(),
            max_daily_loss: default_max_daily_loss(),
            max_order_value: default_max_order_value(),
            max_drawdown: default_max_drawdown(),
            max_orders_per_second: default_max_orders_per_second(),
        }
    }
}
