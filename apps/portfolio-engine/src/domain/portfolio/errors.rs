//! Errors raised by the portfolio aggregate.

use thiserror::Error;

use crate::domain::shared::{Money, OrderId, PortfolioId, ShareCount, Symbol};

/// Errors from portfolio command handling.
///
/// Validation and lifecycle errors are rejected synchronously with nothing
/// persisted. Duplicate trade results are not errors; they return success
/// with no new events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortfolioError {
    /// Order parameters failed validation.
    #[error("Invalid order: {field}: {message}")]
    InvalidOrder {
        /// Offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// Sell order for more shares than currently held.
    #[error("Insufficient shares of {symbol}: requested {requested}, available {available}")]
    InsufficientShares {
        /// Symbol being sold.
        symbol: Symbol,
        /// Shares requested.
        requested: ShareCount,
        /// Shares available.
        available: ShareCount,
    },

    /// Debit for more funds than currently available.
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Amount requested.
        requested: Money,
        /// Funds available.
        available: Money,
    },

    /// Funds transfer amount was zero or negative.
    #[error("Invalid transfer amount: {amount}")]
    InvalidTransfer {
        /// Offending amount.
        amount: Money,
    },

    /// Command against a closed portfolio.
    #[error("Portfolio {portfolio_id} is closed")]
    PortfolioClosed {
        /// The closed portfolio.
        portfolio_id: PortfolioId,
    },

    /// Command against an id with no journal.
    #[error("Portfolio {portfolio_id} does not exist")]
    NotOpened {
        /// The unknown portfolio id.
        portfolio_id: PortfolioId,
    },

    /// Open against an id that already has a journal.
    #[error("Portfolio id {portfolio_id} is already in use")]
    AlreadyOpened {
        /// The colliding portfolio id.
        portfolio_id: PortfolioId,
    },

    /// Trade result for an order this portfolio never placed.
    #[error("Order {order_id} was not placed by this portfolio")]
    UnknownOrder {
        /// The unknown order id.
        order_id: OrderId,
    },
}

impl PortfolioError {
    /// Returns true for errors that will never succeed on redelivery.
    ///
    /// The reconciler acknowledges (dead-letters) these instead of retrying.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::InvalidOrder { .. }
                | Self::InsufficientShares { .. }
                | Self::InsufficientFunds { .. }
                | Self::InvalidTransfer { .. }
                | Self::PortfolioClosed { .. }
                | Self::NotOpened { .. }
                | Self::AlreadyOpened { .. }
                | Self::UnknownOrder { .. }
        )
    }
}
