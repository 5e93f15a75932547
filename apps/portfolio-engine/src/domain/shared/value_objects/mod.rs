//! Shared value objects.

pub mod identifiers;
pub mod money;
pub mod share_count;
pub mod symbol;
pub mod timestamp;

pub use identifiers::{OrderId, PortfolioId};
pub use money::Money;
pub use share_count::ShareCount;
pub use symbol::Symbol;
pub use timestamp::Timestamp;
