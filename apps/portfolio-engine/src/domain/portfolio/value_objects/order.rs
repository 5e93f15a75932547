//! Order entity and the details clients submit to place one.

use serde::{Deserialize, Serialize};

use super::{OrderConditions, OrderStatus, OrderType};
use crate::domain::portfolio::errors::PortfolioError;
use crate::domain::shared::{OrderId, PortfolioId, ShareCount, Symbol};

/// Client-supplied parameters for placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Number of shares.
    pub share_count: ShareCount,
    /// Buy or sell.
    pub order_type: OrderType,
    /// Execution conditions.
    pub conditions: OrderConditions,
}

impl OrderDetails {
    /// Market order details.
    #[must_use]
    pub fn market(symbol: Symbol, share_count: ShareCount, order_type: OrderType) -> Self {
        Self {
            symbol,
            share_count,
            order_type,
            conditions: OrderConditions::Market,
        }
    }

    /// Validate the details for placement.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOrder` if the symbol or share count is invalid.
    pub fn validate(&self) -> Result<(), PortfolioError> {
        self.symbol
            .validate()
            .map_err(|e| PortfolioError::InvalidOrder {
                field: "symbol".to_string(),
                message: e.to_string(),
            })?;
        self.share_count
            .validate_for_order()
            .map_err(|e| PortfolioError::InvalidOrder {
                field: "share_count".to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

/// An order placed by a portfolio.
///
/// Immutable once created except for `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier, unique per issuing portfolio.
    pub order_id: OrderId,
    /// The issuing portfolio.
    pub portfolio_id: PortfolioId,
    /// The order parameters.
    pub details: OrderDetails,
    /// Current status.
    pub status: OrderStatus,
}

impl Order {
    /// Create a freshly placed order.
    #[must_use]
    pub const fn placed(order_id: OrderId, portfolio_id: PortfolioId, details: OrderDetails) -> Self {
        Self {
            order_id,
            portfolio_id,
            details,
            status: OrderStatus::Placed,
        }
    }

    /// The traded symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.details.symbol
    }

    /// The ordered share count.
    #[must_use]
    pub const fn share_count(&self) -> ShareCount {
        self.details.share_count
    }

    /// Buy or sell.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.details.order_type
    }
}
