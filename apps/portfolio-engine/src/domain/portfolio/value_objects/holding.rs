//! Holdings and their query-time valuations.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{Money, ShareCount, Symbol};

/// A position in one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Held symbol.
    pub symbol: Symbol,
    /// Number of shares held.
    pub share_count: ShareCount,
}

impl Holding {
    /// Create a new holding.
    #[must_use]
    pub const fn new(symbol: Symbol, share_count: ShareCount) -> Self {
        Self {
            symbol,
            share_count,
        }
    }
}

/// A holding priced at query time. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuedHolding {
    /// Held symbol.
    pub symbol: Symbol,
    /// Number of shares held.
    pub share_count: ShareCount,
    /// Quote price × share count at query time.
    pub market_value: Money,
}

impl ValuedHolding {
    /// Value a holding at the given per-share price.
    #[must_use]
    pub fn at_price(holding: &Holding, share_price: Money) -> Self {
        Self {
            symbol: holding.symbol.clone(),
            share_count: holding.share_count,
            market_value: share_price.times(holding.share_count),
        }
    }
}
