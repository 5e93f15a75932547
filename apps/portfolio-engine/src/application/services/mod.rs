//! Application services.

pub mod portfolio_service;
pub mod valuation_service;
mod worker;

pub use portfolio_service::{PortfolioService, PortfolioView, ServiceError};
pub use valuation_service::{PortfolioValuation, ValuationError, ValuationService};
