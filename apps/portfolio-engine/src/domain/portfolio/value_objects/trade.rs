//! Trade produced by the external execution system.

use serde::{Deserialize, Serialize};

use super::OrderType;
use crate::domain::shared::{Money, OrderId, ShareCount, Symbol};

/// The outcome of an executed order.
///
/// Produced by the external trading system, never by this core. The
/// settlement price is per share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// The order this trade settles.
    pub order_id: OrderId,
    /// Traded symbol.
    pub symbol: Symbol,
    /// Number of shares traded.
    pub share_count: ShareCount,
    /// Buy or sell.
    pub order_type: OrderType,
    /// Per-share settlement price.
    pub price: Money,
}

impl Trade {
    /// Total value of the trade (price × shares).
    #[must_use]
    pub fn total_value(&self) -> Money {
        self.price.times(self.share_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn trade_total_value() {
        let trade = Trade {
            order_id: OrderId::new("ord-1"),
            symbol: Symbol::new("IBM"),
            share_count: ShareCount::new(31),
            order_type: OrderType::Buy,
            price: Money::new(dec!(152.12)),
        };
        assert_eq!(trade.total_value(), Money::new(dec!(4715.72)));
    }
}
