//! Loyalty level derived from trading activity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A monotonic counter bumped once per settled trade.
///
/// Derived state: it only ever increases and is rebuilt by replay like the
/// rest of the portfolio.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LoyaltyLevel(u64);

impl LoyaltyLevel {
    /// Starting level for a freshly opened portfolio.
    pub const NEW: Self = Self(0);

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u64 {
        self.0
    }

    /// The next level after one more settled trade.
    #[must_use]
    pub const fn bumped(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LoyaltyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
