//! Risk gate rejection reasons.

use rust_decimal::Decimal;
use thiserror::Error;

/// A failed risk check. The variant identifies which check rejected the
/// order; checks short-circuit, so this is always the first failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RiskViolation {
    /// Projected position after a full fill would exceed the limit.
    #[error("projected position {projected} exceeds limit {limit}")]
    PositionSize { projected: Decimal, limit: Decimal },

    /// Order notional exceeds the per-order value limit.
    #[error("order notional {notional} exceeds limit {limit}")]
    OrderValue { notional: Decimal, limit: Decimal },

    /// Too many orders admitted within the current one-second window.
    #[error("order rate above {limit}/s")]
    OrderRate { limit: u32 },
}
