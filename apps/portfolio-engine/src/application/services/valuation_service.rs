//! Valuation Service
//!
//! Prices a set of holdings concurrently against the quote provider. One
//! quote call per symbol, all in flight at once, each bounded by a timeout.
//! Valuation is all-or-nothing: a single missing or late quote fails the
//! whole call rather than returning a partial total.

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use crate::application::ports::{QuoteError, QuoteProviderPort};
use crate::domain::portfolio::value_objects::{Holding, ValuedHolding};
use crate::domain::shared::{Money, Symbol};

/// Errors from valuing a portfolio.
#[derive(Debug, Clone, Error)]
pub enum ValuationError {
    /// A quote call failed.
    #[error(transparent)]
    Quote(#[from] QuoteError),

    /// A quote call exceeded the per-quote deadline.
    #[error("quote for {symbol} timed out")]
    Timeout {
        /// Symbol whose quote was late.
        symbol: Symbol,
    },
}

/// A fully priced set of holdings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioValuation {
    /// Priced positions, in the same (symbol) order as the input holdings.
    pub positions: Vec<ValuedHolding>,
    /// Sum of all position values.
    pub total_value: Money,
}

/// Concurrent quote-based valuation.
#[derive(Debug)]
pub struct ValuationService<Q> {
    quotes: Arc<Q>,
    quote_timeout: Duration,
}

impl<Q> ValuationService<Q>
where
    Q: QuoteProviderPort,
{
    /// Create a valuation service with a per-quote deadline.
    pub fn new(quotes: Arc<Q>, quote_timeout: Duration) -> Self {
        Self {
            quotes,
            quote_timeout,
        }
    }

    /// Value a set of holdings.
    ///
    /// # Errors
    ///
    /// The first quote failure or timeout fails the entire valuation.
    pub async fn value(&self, holdings: &[Holding]) -> Result<PortfolioValuation, ValuationError> {
        let positions =
            future::try_join_all(holdings.iter().map(|h| self.price_holding(h))).await?;
        let total_value = positions
            .iter()
            .fold(Money::ZERO, |acc, p| acc + p.market_value);

        debug!(
            positions = positions.len(),
            total = %total_value,
            "valuation complete"
        );
        Ok(PortfolioValuation {
            positions,
            total_value,
        })
    }

    async fn price_holding(&self, holding: &Holding) -> Result<ValuedHolding, ValuationError> {
        let quote = timeout(self.quote_timeout, self.quotes.quote(&holding.symbol))
            .await
            .map_err(|_| ValuationError::Timeout {
                symbol: holding.symbol.clone(),
            })??;
        Ok(ValuedHolding::at_price(holding, quote.price))
    }
}
