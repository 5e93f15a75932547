//! Order status lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an order from the portfolio's point of view.
///
/// Orders are immutable once placed except for this field. `Placed` means
/// the order is awaiting its trade outcome from the execution system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted and published; outcome pending.
    Placed,
    /// Trade settled against funds and holdings.
    Settled,
    /// Execution failed; any reservation was compensated.
    Failed,
}

impl OrderStatus {
    /// Returns true if the order is still awaiting its outcome.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Placed)
    }

    /// Returns true for terminal statuses.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Failed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placed => write!(f, "PLACED"),
            Self::Settled => write!(f, "SETTLED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}
