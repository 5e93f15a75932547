//! Share count value object for holdings and orders.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use crate::domain::shared::DomainError;

/// A non-negative whole number of shares.
///
/// Holdings never go below zero at rest; subtraction is checked so the
/// invariant cannot be violated silently.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ShareCount(u64);

impl ShareCount {
    /// Create a new share count.
    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    /// Zero shares.
    pub const ZERO: Self = Self(0);

    /// Get the inner count.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.0
    }

    /// Returns true if this count is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked subtraction; `None` if `rhs` exceeds this count.
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Validate for order placement.
    ///
    /// # Errors
    ///
    /// Returns error if the count is zero.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if self.is_zero() {
            return Err(DomainError::InvalidValue {
                field: "share_count".to_string(),
                message: "Order share count must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for ShareCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for ShareCount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl From<u64> for ShareCount {
    fn from(count: u64) -> Self {
        Self(count)
    }
}
