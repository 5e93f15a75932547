//! Get Valued Portfolio
//!
//! Reads a portfolio's current state and prices its holdings in one call.
//! The view comes from the portfolio's worker; pricing fans out through the
//! valuation service afterward, so quotes never block the worker.

use thiserror::Error;

use crate::application::ports::{EventStorePort, QuoteProviderPort};
use crate::application::services::{
    PortfolioService, PortfolioView, ServiceError, ValuationError, ValuationService,
};
use crate::domain::portfolio::value_objects::ValuedHolding;
use crate::domain::shared::{Money, PortfolioId};

/// Errors from valued-portfolio retrieval.
#[derive(Debug, Error)]
pub enum ValuedPortfolioError {
    /// Reading the portfolio failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Pricing the holdings failed.
    #[error(transparent)]
    Valuation(#[from] ValuationError),
}

/// A portfolio view with every holding priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuedPortfolio {
    /// The unpriced view.
    pub view: PortfolioView,
    /// Priced positions in symbol order.
    pub positions: Vec<ValuedHolding>,
    /// Sum of all position values.
    pub total_value: Money,
}

/// Read and price one portfolio.
///
/// # Errors
///
/// `Service` for unknown ids or storage failures, `Valuation` when any
/// holding cannot be priced.
pub async fn get_valued_portfolio<S, Q>(
    portfolios: &PortfolioService<S>,
    valuation: &ValuationService<Q>,
    portfolio_id: &PortfolioId,
) -> Result<ValuedPortfolio, ValuedPortfolioError>
where
    S: EventStorePort + Send + Sync + 'static,
    Q: QuoteProviderPort,
{
    let view = portfolios.portfolio(portfolio_id).await?;
    let valuation = valuation.value(&view.holdings).await?;
    Ok(ValuedPortfolio {
        view,
        positions: valuation.positions,
        total_value: valuation.total_value,
    })
}
