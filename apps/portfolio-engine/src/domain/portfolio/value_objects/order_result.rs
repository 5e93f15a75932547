//! Trade outcome messages from the execution system.

use serde::{Deserialize, Serialize};

use super::Trade;
use crate::domain::shared::{OrderId, PortfolioId};

/// Outcome of an order, delivered at-least-once over the result stream.
///
/// Messages may be duplicated and reordered relative to other orders (never
/// relative to themselves); the aggregate dedups by order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderResult {
    /// The order executed; `trade` carries the settlement terms.
    Fulfilled {
        /// The settled order.
        order_id: OrderId,
        /// The issuing portfolio.
        portfolio_id: PortfolioId,
        /// Settlement terms.
        trade: Trade,
    },
    /// The order could not be executed.
    Failed {
        /// The failed order.
        order_id: OrderId,
        /// The issuing portfolio.
        portfolio_id: PortfolioId,
    },
}

impl OrderResult {
    /// The order this result is for.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        match self {
            Self::Fulfilled { order_id, .. } | Self::Failed { order_id, .. } => order_id,
        }
    }

    /// The portfolio this result routes to.
    #[must_use]
    pub const fn portfolio_id(&self) -> &PortfolioId {
        match self {
            Self::Fulfilled { portfolio_id, .. } | Self::Failed { portfolio_id, .. } => {
                portfolio_id
            }
        }
    }

    /// Returns true for fulfilled results.
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::value_objects::OrderType;
    use crate::domain::shared::{Money, ShareCount, Symbol};
    use rust_decimal_macros::dec;

    fn fulfilled() -> OrderResult {
        OrderResult::Fulfilled {
            order_id: OrderId::new("ord-1"),
            portfolio_id: PortfolioId::new("pf-1"),
            trade: Trade {
                order_id: OrderId::new("ord-1"),
                symbol: Symbol::new("IBM"),
                share_count: ShareCount::new(31),
                order_type: OrderType::Buy,
                price: Money::new(dec!(152.12)),
            },
        }
    }

    #[test]
    fn order_result_accessors() {
        let result = fulfilled();
        assert_eq!(result.order_id().as_str(), "ord-1");
        assert_eq!(result.portfolio_id().as_str(), "pf-1");
        assert!(result.is_fulfilled());

        let failed = OrderResult::Failed {
            order_id: OrderId::new("ord-2"),
            portfolio_id: PortfolioId::new("pf-1"),
        };
        assert!(!failed.is_fulfilled());
    }

    #[test]
    fn order_result_wire_format() {
        let json = serde_json::to_string(&fulfilled()).unwrap();
        assert!(json.contains("\"kind\":\"FULFILLED\""));

        let parsed: OrderResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, fulfilled());
    }
}
