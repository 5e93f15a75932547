//! Domain events for the portfolio aggregate.
//!
//! Events are the persisted source of truth: current state is a fold over
//! the per-portfolio journal, strictly ordered by sequence number.

use serde::{Deserialize, Serialize};

use crate::domain::portfolio::value_objects::Order;
use crate::domain::shared::{Money, OrderId, PortfolioId, ShareCount, Symbol, Timestamp};

/// All portfolio events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortfolioEvent {
    /// Portfolio opened.
    Opened(Opened),
    /// Order accepted and recorded.
    OrderPlaced(OrderPlaced),
    /// Sell-side shares reserved ahead of settlement.
    SharesReserved(SharesReserved),
    /// Trade outcome applied to funds and holdings.
    TradeSettled(TradeSettled),
    /// Reserved shares restored after a failed order.
    OrderCompensated(OrderCompensated),
    /// Funds transferred in.
    FundsCredited(FundsCredited),
    /// Funds transferred out.
    FundsDebited(FundsDebited),
    /// Liquidation started; market sells issued for all holdings.
    Liquidated(Liquidated),
    /// Terminal: holdings empty and funds zero.
    Closed(Closed),
}

impl PortfolioEvent {
    /// The portfolio this event belongs to.
    #[must_use]
    pub const fn portfolio_id(&self) -> &PortfolioId {
        match self {
            Self::Opened(e) => &e.portfolio_id,
            Self::OrderPlaced(e) => &e.order.portfolio_id,
            Self::SharesReserved(e) => &e.portfolio_id,
            Self::TradeSettled(e) => &e.portfolio_id,
            Self::OrderCompensated(e) => &e.portfolio_id,
            Self::FundsCredited(e) => &e.portfolio_id,
            Self::FundsDebited(e) => &e.portfolio_id,
            Self::Liquidated(e) => &e.portfolio_id,
            Self::Closed(e) => &e.portfolio_id,
        }
    }

    /// When the event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> Timestamp {
        match self {
            Self::Opened(e) => e.occurred_at,
            Self::OrderPlaced(e) => e.occurred_at,
            Self::SharesReserved(e) => e.occurred_at,
            Self::TradeSettled(e) => e.occurred_at,
            Self::OrderCompensated(e) => e.occurred_at,
            Self::FundsCredited(e) => e.occurred_at,
            Self::FundsDebited(e) => e.occurred_at,
            Self::Liquidated(e) => e.occurred_at,
            Self::Closed(e) => e.occurred_at,
        }
    }

    /// Event type name for logging.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Opened(_) => "OPENED",
            Self::OrderPlaced(_) => "ORDER_PLACED",
            Self::SharesReserved(_) => "SHARES_RESERVED",
            Self::TradeSettled(_) => "TRADE_SETTLED",
            Self::OrderCompensated(_) => "ORDER_COMPENSATED",
            Self::FundsCredited(_) => "FUNDS_CREDITED",
            Self::FundsDebited(_) => "FUNDS_DEBITED",
            Self::Liquidated(_) => "LIQUIDATED",
            Self::Closed(_) => "CLOSED",
        }
    }
}

/// Event: portfolio opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opened {
    /// The new portfolio.
    pub portfolio_id: PortfolioId,
    /// Display name.
    pub name: String,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: order accepted.
///
/// Persisted before any externally visible acknowledgment of the placement;
/// the publisher republishes these onto the order bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// The placed order.
    pub order: Order,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: shares reserved for a pending sell.
///
/// The optimistic pre-decrement so concurrent reads see the pending sale
/// before settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesReserved {
    /// Owning portfolio.
    pub portfolio_id: PortfolioId,
    /// Reserving order.
    pub order_id: OrderId,
    /// Reserved symbol.
    pub symbol: Symbol,
    /// Reserved count.
    pub share_count: ShareCount,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Additive holdings change carried by a settlement (buy side only; a sell's
/// shares were already removed by reservation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingsDelta {
    /// Symbol credited.
    pub symbol: Symbol,
    /// Shares credited.
    pub share_count: ShareCount,
}

/// Event: trade outcome applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSettled {
    /// Owning portfolio.
    pub portfolio_id: PortfolioId,
    /// Settled order.
    pub order_id: OrderId,
    /// Signed funds change (negative for buys).
    pub funds_delta: Money,
    /// Holdings change, if any.
    pub holdings_delta: Option<HoldingsDelta>,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: reservation rolled back after a failed order.
///
/// A failed buy carries a zero share count: nothing was reserved, the event
/// exists to record the order id as processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompensated {
    /// Owning portfolio.
    pub portfolio_id: PortfolioId,
    /// Failed order.
    pub order_id: OrderId,
    /// Restored symbol.
    pub symbol: Symbol,
    /// Restored count (zero for failed buys).
    pub share_count: ShareCount,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: funds transferred into the portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsCredited {
    /// Owning portfolio.
    pub portfolio_id: PortfolioId,
    /// Credited amount (positive).
    pub amount: Money,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: funds transferred out of the portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsDebited {
    /// Owning portfolio.
    pub portfolio_id: PortfolioId,
    /// Debited amount (positive).
    pub amount: Money,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: liquidation started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquidated {
    /// Owning portfolio.
    pub portfolio_id: PortfolioId,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

/// Event: portfolio closed (terminal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closed {
    /// Owning portfolio.
    pub portfolio_id: PortfolioId,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}
