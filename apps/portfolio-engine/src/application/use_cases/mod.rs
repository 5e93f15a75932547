//! Use cases composing services and ports.

pub mod get_valued_portfolio;

pub use get_valued_portfolio::{get_valued_portfolio, ValuedPortfolio, ValuedPortfolioError};
