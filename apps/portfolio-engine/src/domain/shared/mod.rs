//! Shared Domain Types
//!
//! Value objects and errors shared across the portfolio domain.

pub mod errors;
pub mod value_objects;

pub use errors::DomainError;
pub use value_objects::{Money, OrderId, PortfolioId, ShareCount, Symbol, Timestamp};
