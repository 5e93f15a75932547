//! Portfolio Aggregate Root.

mod portfolio;

pub use portfolio::Portfolio;
