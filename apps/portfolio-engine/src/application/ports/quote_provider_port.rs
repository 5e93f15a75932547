//! Quote Provider Port
//!
//! Interface for current market prices, used by valuation. Implementations
//! may be remote and slow; the valuation service bounds each call with its
//! own timeout.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::shared::{Money, Symbol};

/// A current price for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Quoted symbol.
    pub symbol: Symbol,
    /// Price per share.
    pub price: Money,
}

/// Errors from quote retrieval.
#[derive(Debug, Clone, Error)]
pub enum QuoteError {
    /// The provider has no price for this symbol.
    #[error("no quote available for {symbol}")]
    Unavailable {
        /// Symbol without a price.
        symbol: Symbol,
    },

    /// The provider failed.
    #[error("quote provider error for {symbol}: {message}")]
    Provider {
        /// Symbol being quoted.
        symbol: Symbol,
        /// Provider-specific description.
        message: String,
    },
}

/// Port for fetching current quotes.
#[async_trait]
pub trait QuoteProviderPort: Send + Sync {
    /// Fetch the current quote for one symbol.
    ///
    /// # Errors
    ///
    /// `Unavailable` for unknown symbols, `Provider` on upstream failure.
    async fn quote(&self, symbol: &Symbol) -> Result<Quote, QuoteError>;
}
