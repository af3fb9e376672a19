//! Market identifiers and market-data types.

use crate::{Price, Qty};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique order identifier, allocated by the order ledger.
///
/// Zero is the distinguished invalid id and is never allocated.
pub type OrderId = u64;

/// Unique instrument identifier. Zero is invalid.
pub type InstrumentId = u64;

/// Venue identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    #[default]
    Unknown,
    /// Shanghai Stock Exchange.
    ChinaSse,
    /// Shenzhen Stock Exchange.
    ChinaSzse,
    /// Hong Kong Exchange.
    HongKong,
    /// New York Stock Exchange.
    UsaNyse,
    /// NASDAQ.
    UsaNasdaq,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::ChinaSse => write!(f, "china_sse"),
            Self::ChinaSzse => write!(f, "china_szse"),
            Self::HongKong => write!(f, "hong_kong"),
            Self::UsaNyse => write!(f, "usa_nyse"),
            Self::UsaNasdaq => write!(f, "usa_nasdaq"),
        }
    }
}

/// A bid/ask market-data snapshot for one instrument at one instant.
///
/// Ticks are immutable and ephemeral: produced once by the feed,
/// consumed once by the strategy dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument this tick belongs to.
    pub instrument: InstrumentId,
    /// Best bid price.
    pub bid_price: Price,
    /// Best bid size.
    pub bid_size: Qty,
    /// Best ask price.
    pub ask_price: Price,
    /// Best ask size.
    pub ask_size: Qty,
    /// Timestamp when this tick was received.
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    /// Create a new tick stamped with the current time.
    pub fn new(
        instrument: InstrumentId,
        bid_price: Price,
        bid_size: Qty,
        ask_price: Price,
        ask_size: Qty,
    ) -> Self {
        Self {
            instrument,
            bid_price,
            bid_size,
            ask_price,
            ask_size,
            timestamp: Utc::now(),
        }
    }

    /// Check that both sides are present and the book is not crossed.
    pub fn is_valid(&self) -> bool {
        self.bid_price.is_positive()
            && self.ask_price.is_positive()
            && self.bid_price < self.ask_price
    }

    /// Calculate mid price: (bid + ask) / 2.
    ///
    /// Returns None when a side is missing or the book is crossed.
    pub fn mid(&self) -> Option<Price> {
        if !self.is_valid() {
            return None;
        }
        Some(Price::new(
            (self.bid_price.inner() + self.ask_price.inner()) / Decimal::TWO,
        ))
    }

    /// Calculate spread: ask - bid.
    pub fn spread(&self) -> Price {
        self.ask_price - self.bid_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tick(bid: Decimal, ask: Decimal) -> Tick {
        Tick::new(
            1,
            Price::new(bid),
            Qty::new(dec!(100)),
            Price::new(ask),
            Qty::new(dec!(100)),
        )
    }

    #[test]
    fn test_mid_price() {
        assert_eq!(tick(dec!(100), dec!(102)).mid(), Some(Price::new(dec!(101))));
    }

    #[test]
    fn test_mid_rejects_crossed_book() {
        assert!(tick(dec!(102), dec!(100)).mid().is_none());
        assert!(tick(dec!(0), dec!(100)).mid().is_none());
    }

    #[test]
    fn test_spread() {
        assert_eq!(tick(dec!(100), dec!(100.5)).spread(), Price::new(dec!(0.5)));
    }
}
