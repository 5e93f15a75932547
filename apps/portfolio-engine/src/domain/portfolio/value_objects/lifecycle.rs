//! Portfolio lifecycle state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a portfolio: Open → Liquidating → Closed (terminal).
///
/// Orders and trade results are legal while Open or Liquidating. A closed
/// portfolio is retained for audit but rejects every mutating command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Accepting commands.
    Open,
    /// Selling all holdings; closes once holdings are empty and funds are zero.
    Liquidating,
    /// Terminal.
    Closed,
}

impl LifecycleState {
    /// Returns true if orders and trade results are accepted.
    #[must_use]
    pub const fn accepts_orders(&self) -> bool {
        matches!(self, Self::Open | Self::Liquidating)
    }

    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns true while liquidation is in progress.
    #[must_use]
    pub const fn is_liquidating(&self) -> bool {
        matches!(self, Self::Liquidating)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Liquidating => write!(f, "LIQUIDATING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}
