//! Order conditions (market/limit).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::Money;

/// Execution conditions attached to an order.
///
/// Liquidation always uses market orders; limit orders are accepted from
/// clients and passed through to the execution system unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderConditions {
    /// Execute at the prevailing market price.
    Market,
    /// Execute at `limit_price` or better.
    Limit {
        /// The worst acceptable per-share price.
        limit_price: Money,
    },
}

impl OrderConditions {
    /// Returns true for market orders.
    #[must_use]
    pub const fn is_market(&self) -> bool {
        matches!(self, Self::Market)
    }
}

impl fmt::Display for OrderConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit { limit_price } => write!(f, "LIMIT@{limit_price}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn conditions_is_market() {
        assert!(OrderConditions::Market.is_market());
        assert!(!OrderConditions::Limit {
            limit_price: Money::new(dec!(10))
        }
        .is_market());
    }

    #[test]
    fn conditions_serde_roundtrip() {
        let c = OrderConditions::Limit {
            limit_price: Money::new(dec!(152.12)),
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("LIMIT"));
        let parsed: OrderConditions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, c);
    }
}
