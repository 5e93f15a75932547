//! Quote provider adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::{Quote, QuoteError, QuoteProviderPort};
use crate::domain::shared::{Money, Symbol};

/// Quote provider backed by a mutable in-process price table.
///
/// Serves local runs and tests; a market-data adapter implements the same
/// port in a deployed setup.
#[derive(Debug, Default)]
pub struct StaticQuoteProvider {
    prices: RwLock<HashMap<Symbol, Money>>,
}

impl StaticQuoteProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider seeded with prices.
    #[must_use]
    pub fn with_prices(prices: impl IntoIterator<Item = (Symbol, Money)>) -> Self {
        Self {
            prices: RwLock::new(prices.into_iter().collect()),
        }
    }

    /// Set or update the price for a symbol.
    pub async fn set_price(&self, symbol: Symbol, price: Money) {
        self.prices.write().await.insert(symbol, price);
    }

    /// Remove a symbol's price; subsequent quotes fail as unavailable.
    pub async fn remove_price(&self, symbol: &Symbol) {
        self.prices.write().await.remove(symbol);
    }
}

#[async_trait]
impl QuoteProviderPort for StaticQuoteProvider {
    async fn quote(&self, symbol: &Symbol) -> Result<Quote, QuoteError> {
        self.prices
            .read()
            .await
            .get(symbol)
            .map(|price| Quote {
                symbol: symbol.clone(),
                price: *price,
            })
            .ok_or_else(|| QuoteError::Unavailable {
                symbol: symbol.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn serves_and_updates_prices() {
        let provider = StaticQuoteProvider::new();
        let ibm = Symbol::new("IBM");

        assert!(matches!(
            provider.quote(&ibm).await.unwrap_err(),
            QuoteError::Unavailable { .. }
        ));

        provider.set_price(ibm.clone(), Money::new(dec!(152.12))).await;
        assert_eq!(
            provider.quote(&ibm).await.unwrap().price,
            Money::new(dec!(152.12))
        );

        provider.remove_price(&ibm).await;
        assert!(provider.quote(&ibm).await.is_err());
    }
}
