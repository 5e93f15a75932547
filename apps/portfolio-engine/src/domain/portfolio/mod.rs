//! Portfolio bounded context.
//!
//! The portfolio aggregate, its domain events, and supporting value objects.
//! State changes are persisted as an ordered sequence of immutable events and
//! current state is reconstructed by replay.

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod value_objects;

pub use aggregate::Portfolio;
pub use errors::PortfolioError;
pub use events::PortfolioEvent;
