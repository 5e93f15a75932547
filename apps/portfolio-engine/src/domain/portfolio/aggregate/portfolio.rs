//! Portfolio Aggregate Root
//!
//! The single-writer owner of one portfolio's state. Command handlers are
//! pure: they inspect current state and return the events to persist, or an
//! error with nothing persisted. `apply` folds one event into state and is
//! used both for live mutation (after a successful append) and for recovery
//! by full replay of the journal.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::portfolio::errors::PortfolioError;
use crate::domain::portfolio::events::{
    Closed, FundsCredited, FundsDebited, HoldingsDelta, Liquidated, Opened, OrderCompensated,
    OrderPlaced, PortfolioEvent, SharesReserved, TradeSettled,
};
use crate::domain::portfolio::value_objects::{
    Holding, LifecycleState, LoyaltyLevel, Order, OrderDetails, OrderResult, OrderStatus,
    OrderType,
};
use crate::domain::shared::{Money, OrderId, PortfolioId, ShareCount, Symbol, Timestamp};

/// Maximum processed order ids retained for dedup before the oldest are
/// pruned. Redeliveries arrive within a settlement window, not months later,
/// so a bounded window is sufficient.
const PROCESSED_ORDER_CAP: usize = 10_000;

/// Dedup set for applied trade results, bounded FIFO.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProcessedOrderIds {
    ids: HashSet<OrderId>,
    order: VecDeque<OrderId>,
}

impl ProcessedOrderIds {
    fn contains(&self, id: &OrderId) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, id: OrderId) {
        if self.ids.insert(id.clone()) {
            self.order.push_back(id);
        }
        while self.order.len() > PROCESSED_ORDER_CAP {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }
}

/// The portfolio aggregate.
///
/// Mutated only through `apply`; all writers for one id go through its
/// exclusive processing context, so no locking is needed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    id: PortfolioId,
    name: String,
    funds: Money,
    holdings: BTreeMap<Symbol, ShareCount>,
    loyalty_level: LoyaltyLevel,
    lifecycle: LifecycleState,
    orders: HashMap<OrderId, Order>,
    processed: ProcessedOrderIds,
}

impl Portfolio {
    // ========================================================================
    // Command handlers (decide)
    // ========================================================================

    /// Events opening a fresh portfolio.
    ///
    /// Id-collision detection happens at the journal: the caller appends
    /// these events at version zero and maps a version conflict to a
    /// collision.
    #[must_use]
    pub fn open(portfolio_id: PortfolioId, name: impl Into<String>) -> Vec<PortfolioEvent> {
        vec![PortfolioEvent::Opened(Opened {
            portfolio_id,
            name: name.into(),
            occurred_at: Timestamp::now(),
        })]
    }

    /// Place an order.
    ///
    /// Sell orders reserve their shares immediately (optimistic
    /// reservation), so concurrent reads see the pending sale before the
    /// trade result arrives. Buy orders take full effect at settlement.
    ///
    /// # Errors
    ///
    /// `InvalidOrder` on bad parameters, `InsufficientShares` when a sell
    /// exceeds the current holding, `PortfolioClosed` after closure. Nothing
    /// is persisted on error.
    pub fn place_order(
        &self,
        details: OrderDetails,
    ) -> Result<(OrderId, Vec<PortfolioEvent>), PortfolioError> {
        self.ensure_accepts_orders()?;
        details.validate()?;

        let order_id = OrderId::generate();
        let order = Order::placed(order_id.clone(), self.id.clone(), details);
        let events = self.placement_events(order)?;
        Ok((order_id, events))
    }

    /// Apply a trade outcome. Idempotent on order id.
    ///
    /// A result already applied returns `Ok` with no events. Fulfilled
    /// results settle funds and holdings; failed sells restore their
    /// reservation. While liquidating, shares that reappear are sold again
    /// in the same decision (a failed sell's restored shares, or a buy that
    /// settles after liquidation started), so liquidation converges.
    ///
    /// # Errors
    ///
    /// `PortfolioClosed` after closure, `UnknownOrder` for an order this
    /// portfolio never placed.
    pub fn apply_order_result(
        &self,
        result: &OrderResult,
    ) -> Result<Vec<PortfolioEvent>, PortfolioError> {
        if self.lifecycle.is_closed() {
            return Err(PortfolioError::PortfolioClosed {
                portfolio_id: self.id.clone(),
            });
        }
        if self.processed.contains(result.order_id()) {
            return Ok(Vec::new());
        }
        let order = self
            .orders
            .get(result.order_id())
            .ok_or_else(|| PortfolioError::UnknownOrder {
                order_id: result.order_id().clone(),
            })?;

        match result {
            OrderResult::Fulfilled { trade, .. } => {
                let total = trade.total_value();
                let (funds_delta, holdings_delta) = match trade.order_type {
                    OrderType::Buy => (
                        -total,
                        Some(HoldingsDelta {
                            symbol: trade.symbol.clone(),
                            share_count: trade.share_count,
                        }),
                    ),
                    // Sell shares were already removed by the reservation.
                    OrderType::Sell => (total, None),
                };

                let mut events = vec![PortfolioEvent::TradeSettled(TradeSettled {
                    portfolio_id: self.id.clone(),
                    order_id: trade.order_id.clone(),
                    funds_delta,
                    holdings_delta: holdings_delta.clone(),
                    occurred_at: Timestamp::now(),
                })];

                if self.lifecycle.is_liquidating() {
                    if let Some(delta) = &holdings_delta {
                        // A buy landing mid-liquidation must still be sold.
                        events.extend(self.resell_events(&delta.symbol, delta.share_count));
                    }
                }

                let holdings_empty_after = holdings_delta.is_none() && self.holdings.is_empty();
                let funds_after = self.funds + funds_delta;
                if self.ready_to_close(&trade.order_id, funds_after, holdings_empty_after) {
                    events.push(self.closed_event());
                }
                Ok(events)
            }
            OrderResult::Failed { order_id, .. } => {
                let restored = if order.order_type().is_sell() {
                    order.share_count()
                } else {
                    ShareCount::ZERO
                };
                let mut events = vec![PortfolioEvent::OrderCompensated(OrderCompensated {
                    portfolio_id: self.id.clone(),
                    order_id: order_id.clone(),
                    symbol: order.symbol().clone(),
                    share_count: restored,
                    occurred_at: Timestamp::now(),
                })];

                if self.lifecycle.is_liquidating() && !restored.is_zero() {
                    // Liquidation must still sell the restored shares.
                    events.extend(self.resell_events(order.symbol(), restored));
                }
                Ok(events)
            }
        }
    }

    /// Start liquidation: market sells for every holding.
    ///
    /// The portfolio closes once holdings are empty and funds are exactly
    /// zero. With residual (or negative) funds it remains `Liquidating`
    /// indefinitely pending an external funds transfer; that is a defined
    /// non-terminal state, not an error. Already-liquidating portfolios
    /// acknowledge without new events.
    ///
    /// # Errors
    ///
    /// `PortfolioClosed` after closure.
    pub fn liquidate(&self) -> Result<Vec<PortfolioEvent>, PortfolioError> {
        if self.lifecycle.is_closed() {
            return Err(PortfolioError::PortfolioClosed {
                portfolio_id: self.id.clone(),
            });
        }
        if self.lifecycle.is_liquidating() {
            return Ok(Vec::new());
        }

        let mut events = vec![PortfolioEvent::Liquidated(Liquidated {
            portfolio_id: self.id.clone(),
            occurred_at: Timestamp::now(),
        })];

        for (symbol, share_count) in &self.holdings {
            let order = Order::placed(
                OrderId::generate(),
                self.id.clone(),
                OrderDetails::market(symbol.clone(), *share_count, OrderType::Sell),
            );
            events.push(PortfolioEvent::OrderPlaced(OrderPlaced {
                order: order.clone(),
                occurred_at: Timestamp::now(),
            }));
            events.push(PortfolioEvent::SharesReserved(SharesReserved {
                portfolio_id: self.id.clone(),
                order_id: order.order_id,
                symbol: symbol.clone(),
                share_count: *share_count,
                occurred_at: Timestamp::now(),
            }));
        }

        if self.holdings.is_empty() && self.funds.is_zero() && !self.has_pending_orders() {
            events.push(self.closed_event());
        }
        Ok(events)
    }

    /// Credit transferred-in funds.
    ///
    /// # Errors
    ///
    /// `InvalidTransfer` for non-positive amounts, `PortfolioClosed` after
    /// closure.
    pub fn credit_funds(&self, amount: Money) -> Result<Vec<PortfolioEvent>, PortfolioError> {
        self.ensure_accepts_orders()?;
        if !amount.is_positive() {
            return Err(PortfolioError::InvalidTransfer { amount });
        }
        Ok(vec![PortfolioEvent::FundsCredited(FundsCredited {
            portfolio_id: self.id.clone(),
            amount,
            occurred_at: Timestamp::now(),
        })])
    }

    /// Debit transferred-out funds.
    ///
    /// Draining residual funds to zero is how an emptied, liquidating
    /// portfolio finally closes.
    ///
    /// # Errors
    ///
    /// `InvalidTransfer` for non-positive amounts, `InsufficientFunds` when
    /// the balance cannot cover the debit, `PortfolioClosed` after closure.
    pub fn debit_funds(&self, amount: Money) -> Result<Vec<PortfolioEvent>, PortfolioError> {
        self.ensure_accepts_orders()?;
        if !amount.is_positive() {
            return Err(PortfolioError::InvalidTransfer { amount });
        }
        if self.funds < amount {
            return Err(PortfolioError::InsufficientFunds {
                requested: amount,
                available: self.funds,
            });
        }

        let mut events = vec![PortfolioEvent::FundsDebited(FundsDebited {
            portfolio_id: self.id.clone(),
            amount,
            occurred_at: Timestamp::now(),
        })];

        let funds_after = self.funds - amount;
        if self.lifecycle.is_liquidating()
            && self.holdings.is_empty()
            && funds_after.is_zero()
            && !self.has_pending_orders()
        {
            events.push(self.closed_event());
        }
        Ok(events)
    }

    // ========================================================================
    // Event fold (apply / replay)
    // ========================================================================

    /// Fold one event into state.
    ///
    /// Events come from this aggregate's own journal; `apply` trusts them
    /// and never fails.
    pub fn apply(&mut self, event: &PortfolioEvent) {
        match event {
            PortfolioEvent::Opened(e) => {
                self.name.clone_from(&e.name);
            }
            PortfolioEvent::OrderPlaced(e) => {
                self.orders.insert(e.order.order_id.clone(), e.order.clone());
            }
            PortfolioEvent::SharesReserved(e) => {
                self.remove_shares(&e.symbol, e.share_count);
            }
            PortfolioEvent::TradeSettled(e) => {
                self.funds += e.funds_delta;
                if let Some(delta) = &e.holdings_delta {
                    self.add_shares(&delta.symbol, delta.share_count);
                }
                self.loyalty_level = self.loyalty_level.bumped();
                if let Some(order) = self.orders.get_mut(&e.order_id) {
                    order.status = OrderStatus::Settled;
                }
                self.processed.insert(e.order_id.clone());
            }
            PortfolioEvent::OrderCompensated(e) => {
                self.add_shares(&e.symbol, e.share_count);
                if let Some(order) = self.orders.get_mut(&e.order_id) {
                    order.status = OrderStatus::Failed;
                }
                self.processed.insert(e.order_id.clone());
            }
            PortfolioEvent::FundsCredited(e) => {
                self.funds += e.amount;
            }
            PortfolioEvent::FundsDebited(e) => {
                self.funds -= e.amount;
            }
            PortfolioEvent::Liquidated(_) => {
                self.lifecycle = LifecycleState::Liquidating;
            }
            PortfolioEvent::Closed(_) => {
                self.lifecycle = LifecycleState::Closed;
            }
        }
    }

    /// Rebuild state by replaying a journal from its first event.
    ///
    /// Returns `None` for an empty journal or one that does not start with
    /// `Opened`.
    #[must_use]
    pub fn replay<'a, I>(events: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a PortfolioEvent>,
    {
        let mut iter = events.into_iter();
        let first = iter.next()?;
        let PortfolioEvent::Opened(opened) = first else {
            return None;
        };

        let mut portfolio = Self::new_opened(opened.portfolio_id.clone(), opened.name.clone());
        for event in iter {
            portfolio.apply(event);
        }
        Some(portfolio)
    }

    fn new_opened(id: PortfolioId, name: String) -> Self {
        Self {
            id,
            name,
            funds: Money::ZERO,
            holdings: BTreeMap::new(),
            loyalty_level: LoyaltyLevel::NEW,
            lifecycle: LifecycleState::Open,
            orders: HashMap::new(),
            processed: ProcessedOrderIds::default(),
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Portfolio id.
    #[must_use]
    pub const fn id(&self) -> &PortfolioId {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current funds; may be negative (overdrawn).
    #[must_use]
    pub const fn funds(&self) -> Money {
        self.funds
    }

    /// Loyalty level.
    #[must_use]
    pub const fn loyalty_level(&self) -> LoyaltyLevel {
        self.loyalty_level
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    /// Current holding for a symbol (zero if absent).
    #[must_use]
    pub fn holding(&self, symbol: &Symbol) -> ShareCount {
        self.holdings.get(symbol).copied().unwrap_or(ShareCount::ZERO)
    }

    /// All holdings in deterministic symbol order.
    #[must_use]
    pub fn holdings(&self) -> Vec<Holding> {
        self.holdings
            .iter()
            .map(|(symbol, count)| Holding::new(symbol.clone(), *count))
            .collect()
    }

    /// A previously placed order, if known.
    #[must_use]
    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn ensure_accepts_orders(&self) -> Result<(), PortfolioError> {
        if self.lifecycle.accepts_orders() {
            Ok(())
        } else {
            Err(PortfolioError::PortfolioClosed {
                portfolio_id: self.id.clone(),
            })
        }
    }

    fn placement_events(&self, order: Order) -> Result<Vec<PortfolioEvent>, PortfolioError> {
        let mut events = vec![PortfolioEvent::OrderPlaced(OrderPlaced {
            order: order.clone(),
            occurred_at: Timestamp::now(),
        })];

        if order.order_type().is_sell() {
            let available = self.holding(order.symbol());
            if available < order.share_count() {
                return Err(PortfolioError::InsufficientShares {
                    symbol: order.symbol().clone(),
                    requested: order.share_count(),
                    available,
                });
            }
            events.push(PortfolioEvent::SharesReserved(SharesReserved {
                portfolio_id: self.id.clone(),
                order_id: order.order_id,
                symbol: order.details.symbol,
                share_count: order.details.share_count,
                occurred_at: Timestamp::now(),
            }));
        }
        Ok(events)
    }

    fn ready_to_close(
        &self,
        settling: &OrderId,
        funds_after: Money,
        holdings_empty_after: bool,
    ) -> bool {
        self.lifecycle.is_liquidating()
            && holdings_empty_after
            && funds_after.is_zero()
            && !self.has_pending_orders_besides(settling)
    }

    fn has_pending_orders(&self) -> bool {
        self.orders.values().any(|o| o.status.is_pending())
    }

    fn has_pending_orders_besides(&self, excluded: &OrderId) -> bool {
        self.orders
            .values()
            .any(|o| o.status.is_pending() && o.order_id != *excluded)
    }

    /// A fresh market sell with its reservation, for shares that reappear
    /// while liquidating.
    fn resell_events(&self, symbol: &Symbol, share_count: ShareCount) -> Vec<PortfolioEvent> {
        let order = Order::placed(
            OrderId::generate(),
            self.id.clone(),
            OrderDetails::market(symbol.clone(), share_count, OrderType::Sell),
        );
        vec![
            PortfolioEvent::OrderPlaced(OrderPlaced {
                order: order.clone(),
                occurred_at: Timestamp::now(),
            }),
            PortfolioEvent::SharesReserved(SharesReserved {
                portfolio_id: self.id.clone(),
                order_id: order.order_id,
                symbol: symbol.clone(),
                share_count,
                occurred_at: Timestamp::now(),
            }),
        ]
    }

    fn closed_event(&self) -> PortfolioEvent {
        PortfolioEvent::Closed(Closed {
            portfolio_id: self.id.clone(),
            occurred_at: Timestamp::now(),
        })
    }

    fn add_shares(&mut self, symbol: &Symbol, count: ShareCount) {
        if count.is_zero() {
            return;
        }
        let entry = self
            .holdings
            .entry(symbol.clone())
            .or_insert(ShareCount::ZERO);
        *entry = entry.saturating_add(count);
    }

    fn remove_shares(&mut self, symbol: &Symbol, count: ShareCount) {
        // The journal is written by this aggregate alone; a reservation never
        // exceeds the holding it was decided against.
        let remaining = self
            .holding(symbol)
            .checked_sub(count)
            .unwrap_or(ShareCount::ZERO);
        if remaining.is_zero() {
            self.holdings.remove(symbol);
        } else {
            self.holdings.insert(symbol.clone(), remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::value_objects::Trade;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn opened(name: &str) -> Portfolio {
        let id = PortfolioId::generate();
        let events = Portfolio::open(id, name);
        Portfolio::replay(events.iter()).unwrap()
    }

    fn apply_all(portfolio: &mut Portfolio, events: &[PortfolioEvent]) {
        for event in events {
            portfolio.apply(event);
        }
    }

    fn buy_details(symbol: &str, count: u64) -> OrderDetails {
        OrderDetails::market(Symbol::new(symbol), ShareCount::new(count), OrderType::Buy)
    }

    fn sell_details(symbol: &str, count: u64) -> OrderDetails {
        OrderDetails::market(Symbol::new(symbol), ShareCount::new(count), OrderType::Sell)
    }

    fn fulfilled(portfolio: &Portfolio, order_id: &OrderId, price: Money) -> OrderResult {
        let order = portfolio.order(order_id).unwrap();
        OrderResult::Fulfilled {
            order_id: order_id.clone(),
            portfolio_id: portfolio.id().clone(),
            trade: Trade {
                order_id: order_id.clone(),
                symbol: order.symbol().clone(),
                share_count: order.share_count(),
                order_type: order.order_type(),
                price,
            },
        }
    }

    fn failed(portfolio: &Portfolio, order_id: &OrderId) -> OrderResult {
        OrderResult::Failed {
            order_id: order_id.clone(),
            portfolio_id: portfolio.id().clone(),
        }
    }

    /// Place an order and apply its events.
    fn place(portfolio: &mut Portfolio, details: OrderDetails) -> OrderId {
        let (order_id, events) = portfolio.place_order(details).unwrap();
        apply_all(portfolio, &events);
        order_id
    }

    /// Deliver a result and apply its events.
    fn deliver(portfolio: &mut Portfolio, result: &OrderResult) {
        let events = portfolio.apply_order_result(result).unwrap();
        apply_all(portfolio, &events);
    }

    #[test]
    fn open_produces_opened_event() {
        let portfolio = opened("retirement");
        assert_eq!(portfolio.name(), "retirement");
        assert_eq!(portfolio.lifecycle(), LifecycleState::Open);
        assert_eq!(portfolio.funds(), Money::ZERO);
        assert!(portfolio.holdings().is_empty());
    }

    #[test]
    fn place_buy_emits_only_order_placed() {
        let portfolio = opened("p");
        let (_, events) = portfolio.place_order(buy_details("IBM", 31)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], PortfolioEvent::OrderPlaced(_)));
    }

    #[test]
    fn place_sell_reserves_shares_immediately() {
        let mut portfolio = opened("p");
        let buy = place(&mut portfolio, buy_details("IBM", 31));
        let buy_fill = fulfilled(&portfolio, &buy, Money::new(dec!(152.12)));
        deliver(&mut portfolio, &buy_fill);
        assert_eq!(portfolio.holding(&Symbol::new("IBM")), ShareCount::new(31));

        place(&mut portfolio, sell_details("IBM", 10));
        assert_eq!(portfolio.holding(&Symbol::new("IBM")), ShareCount::new(21));
    }

    #[test]
    fn place_sell_insufficient_shares_rejected() {
        let portfolio = opened("p");
        let err = portfolio.place_order(sell_details("IBM", 10)).unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientShares { .. }));
    }

    #[test]
    fn place_order_zero_shares_rejected() {
        let portfolio = opened("p");
        let err = portfolio.place_order(buy_details("IBM", 0)).unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidOrder { .. }));
    }

    #[test]
    fn buy_settlement_moves_funds_and_holdings() {
        let mut portfolio = opened("p");
        let buy = place(&mut portfolio, buy_details("IBM", 31));
        let buy_fill = fulfilled(&portfolio, &buy, Money::new(dec!(152.12)));
        deliver(&mut portfolio, &buy_fill);

        assert_eq!(portfolio.funds(), Money::new(dec!(-4715.72)));
        assert_eq!(portfolio.holding(&Symbol::new("IBM")), ShareCount::new(31));
        assert_eq!(portfolio.loyalty_level().level(), 1);
        assert_eq!(
            portfolio.order(&buy).unwrap().status,
            OrderStatus::Settled
        );
    }

    #[test]
    fn sell_settlement_adds_funds_without_touching_holdings() {
        let mut portfolio = opened("p");
        let buy = place(&mut portfolio, buy_details("IBM", 31));
        let buy_fill = fulfilled(&portfolio, &buy, Money::new(dec!(100)));
        deliver(&mut portfolio, &buy_fill);

        let sell = place(&mut portfolio, sell_details("IBM", 10));
        assert_eq!(portfolio.holding(&Symbol::new("IBM")), ShareCount::new(21));

        let funds_before = portfolio.funds();
        let sell_fill = fulfilled(&portfolio, &sell, Money::new(dec!(110)));
        deliver(&mut portfolio, &sell_fill);
        assert_eq!(portfolio.holding(&Symbol::new("IBM")), ShareCount::new(21));
        assert_eq!(portfolio.funds(), funds_before + Money::new(dec!(1100)));
    }

    #[test]
    fn failed_sell_restores_reservation_exactly() {
        let mut portfolio = opened("p");
        let buy = place(&mut portfolio, buy_details("IBM", 31));
        let buy_fill = fulfilled(&portfolio, &buy, Money::new(dec!(100)));
        deliver(&mut portfolio, &buy_fill);

        let sell = place(&mut portfolio, sell_details("IBM", 10));
        assert_eq!(portfolio.holding(&Symbol::new("IBM")), ShareCount::new(21));

        let sell_failure = failed(&portfolio, &sell);
        deliver(&mut portfolio, &sell_failure);
        assert_eq!(portfolio.holding(&Symbol::new("IBM")), ShareCount::new(31));
        assert_eq!(portfolio.order(&sell).unwrap().status, OrderStatus::Failed);
    }

    #[test]
    fn failed_buy_needs_no_compensation_but_is_marked_processed() {
        let mut portfolio = opened("p");
        let buy = place(&mut portfolio, buy_details("IBM", 31));

        let buy_failure = failed(&portfolio, &buy);
        deliver(&mut portfolio, &buy_failure);
        assert!(portfolio.holdings().is_empty());
        assert_eq!(portfolio.funds(), Money::ZERO);

        // Redelivery is a no-op.
        let events = portfolio
            .apply_order_result(&failed(&portfolio, &buy))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn duplicate_fulfilled_result_is_not_double_counted() {
        let mut portfolio = opened("p");
        let buy = place(&mut portfolio, buy_details("IBM", 31));
        let result = fulfilled(&portfolio.clone(), &buy, Money::new(dec!(152.12)));

        deliver(&mut portfolio, &result);
        let funds = portfolio.funds();
        let holding = portfolio.holding(&Symbol::new("IBM"));

        let events = portfolio.apply_order_result(&result).unwrap();
        assert!(events.is_empty());
        assert_eq!(portfolio.funds(), funds);
        assert_eq!(portfolio.holding(&Symbol::new("IBM")), holding);
    }

    #[test]
    fn result_for_unknown_order_rejected() {
        let portfolio = opened("p");
        let err = portfolio
            .apply_order_result(&failed(&portfolio, &OrderId::new("ghost")))
            .unwrap_err();
        assert!(matches!(err, PortfolioError::UnknownOrder { .. }));
    }

    #[test]
    fn liquidate_sells_all_holdings_at_market() {
        let mut portfolio = opened("p");
        let buy = place(&mut portfolio, buy_details("IBM", 31));
        let buy_fill = fulfilled(&portfolio, &buy, Money::new(dec!(100)));
        deliver(&mut portfolio, &buy_fill);

        let events = portfolio.liquidate().unwrap();
        apply_all(&mut portfolio, &events);

        assert_eq!(portfolio.lifecycle(), LifecycleState::Liquidating);
        // Reservation empties the holding right away.
        assert!(portfolio.holdings().is_empty());

        let sells: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                PortfolioEvent::OrderPlaced(p) => Some(&p.order),
                _ => None,
            })
            .collect();
        assert_eq!(sells.len(), 1);
        assert!(sells[0].order_type().is_sell());
        assert!(sells[0].details.conditions.is_market());
        assert_eq!(sells[0].share_count(), ShareCount::new(31));
    }

    #[test]
    fn liquidate_is_idempotent_while_liquidating() {
        let mut portfolio = opened("p");
        let credit = portfolio.credit_funds(Money::new(dec!(100))).unwrap();
        apply_all(&mut portfolio, &credit);

        let events = portfolio.liquidate().unwrap();
        apply_all(&mut portfolio, &events);
        assert_eq!(portfolio.lifecycle(), LifecycleState::Liquidating);

        assert!(portfolio.liquidate().unwrap().is_empty());
    }

    #[test]
    fn liquidate_of_empty_zero_portfolio_closes_immediately() {
        let mut portfolio = opened("p");
        let events = portfolio.liquidate().unwrap();
        apply_all(&mut portfolio, &events);
        assert_eq!(portfolio.lifecycle(), LifecycleState::Closed);

        let err = portfolio.liquidate().unwrap_err();
        assert!(matches!(err, PortfolioError::PortfolioClosed { .. }));
    }

    #[test]
    fn liquidation_with_residual_funds_stays_liquidating() {
        let mut portfolio = opened("p");
        let buy = place(&mut portfolio, buy_details("IBM", 10));
        let buy_fill = fulfilled(&portfolio, &buy, Money::new(dec!(100)));
        deliver(&mut portfolio, &buy_fill);

        let events = portfolio.liquidate().unwrap();
        apply_all(&mut portfolio, &events);
        let sell_id = events
            .iter()
            .find_map(|e| match e {
                PortfolioEvent::OrderPlaced(p) => Some(p.order.order_id.clone()),
                _ => None,
            })
            .unwrap();

        let sell_fill = fulfilled(&portfolio, &sell_id, Money::new(dec!(90)));
        deliver(&mut portfolio, &sell_fill);

        // Holdings empty but funds are -1000 + 900 = -100: stays liquidating.
        assert!(portfolio.holdings().is_empty());
        assert_eq!(portfolio.funds(), Money::new(dec!(-100)));
        assert_eq!(portfolio.lifecycle(), LifecycleState::Liquidating);
    }

    #[test]
    fn liquidating_portfolio_closes_when_funds_drain_to_zero() {
        let mut portfolio = opened("p");
        let credit = portfolio.credit_funds(Money::new(dec!(500))).unwrap();
        apply_all(&mut portfolio, &credit);

        let events = portfolio.liquidate().unwrap();
        apply_all(&mut portfolio, &events);
        assert_eq!(portfolio.lifecycle(), LifecycleState::Liquidating);

        let debit = portfolio.debit_funds(Money::new(dec!(500))).unwrap();
        apply_all(&mut portfolio, &debit);
        assert_eq!(portfolio.lifecycle(), LifecycleState::Closed);
    }

    #[test]
    fn failed_sell_during_liquidation_is_replaced() {
        let mut portfolio = opened("p");
        let buy = place(&mut portfolio, buy_details("IBM", 10));
        let buy_fill = fulfilled(&portfolio, &buy, Money::new(dec!(100)));
        deliver(&mut portfolio, &buy_fill);

        let events = portfolio.liquidate().unwrap();
        apply_all(&mut portfolio, &events);
        let sell_id = events
            .iter()
            .find_map(|e| match e {
                PortfolioEvent::OrderPlaced(p) => Some(p.order.order_id.clone()),
                _ => None,
            })
            .unwrap();

        let fail_events = portfolio
            .apply_order_result(&failed(&portfolio, &sell_id))
            .unwrap();
        apply_all(&mut portfolio, &fail_events);

        // Compensation restored the shares and a fresh sell reserved them again.
        assert!(portfolio.holdings().is_empty());
        let replacement = fail_events.iter().find_map(|e| match e {
            PortfolioEvent::OrderPlaced(p) => Some(&p.order),
            _ => None,
        });
        let replacement = replacement.unwrap();
        assert!(replacement.order_type().is_sell());
        assert_eq!(replacement.share_count(), ShareCount::new(10));
        assert_ne!(replacement.order_id, sell_id);
    }

    #[test]
    fn buy_settling_during_liquidation_is_resold() {
        let mut portfolio = opened("p");
        let buy = place(&mut portfolio, buy_details("IBM", 10));

        // Liquidation starts while the buy is still in flight; the pending
        // order keeps the portfolio from closing.
        let events = portfolio.liquidate().unwrap();
        apply_all(&mut portfolio, &events);
        assert_eq!(portfolio.lifecycle(), LifecycleState::Liquidating);

        let settle_events = portfolio
            .apply_order_result(&fulfilled(&portfolio.clone(), &buy, Money::new(dec!(100))))
            .unwrap();
        apply_all(&mut portfolio, &settle_events);

        // The landed shares are reserved by a fresh market sell right away.
        assert!(portfolio.holdings().is_empty());
        let resell = settle_events
            .iter()
            .find_map(|e| match e {
                PortfolioEvent::OrderPlaced(p) => Some(p.order.clone()),
                _ => None,
            })
            .unwrap();
        assert!(resell.order_type().is_sell());
        assert!(resell.details.conditions.is_market());
        assert_eq!(resell.share_count(), ShareCount::new(10));

        // Selling at the buy price drains funds back to zero and closes.
        let resell_fill = fulfilled(&portfolio, &resell.order_id, Money::new(dec!(100)));
        deliver(&mut portfolio, &resell_fill);
        assert_eq!(portfolio.funds(), Money::ZERO);
        assert_eq!(portfolio.lifecycle(), LifecycleState::Closed);
    }

    #[test]
    fn closed_portfolio_rejects_commands() {
        let mut portfolio = opened("p");
        let events = portfolio.liquidate().unwrap();
        apply_all(&mut portfolio, &events);
        assert_eq!(portfolio.lifecycle(), LifecycleState::Closed);

        assert!(matches!(
            portfolio.place_order(buy_details("IBM", 1)).unwrap_err(),
            PortfolioError::PortfolioClosed { .. }
        ));
        assert!(matches!(
            portfolio
                .credit_funds(Money::new(dec!(1)))
                .unwrap_err(),
            PortfolioError::PortfolioClosed { .. }
        ));
        assert!(matches!(
            portfolio
                .apply_order_result(&failed(&portfolio, &OrderId::new("x")))
                .unwrap_err(),
            PortfolioError::PortfolioClosed { .. }
        ));
    }

    #[test]
    fn debit_more_than_funds_rejected() {
        let mut portfolio = opened("p");
        let credit = portfolio.credit_funds(Money::new(dec!(100))).unwrap();
        apply_all(&mut portfolio, &credit);

        let err = portfolio.debit_funds(Money::new(dec!(200))).unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientFunds { .. }));
    }

    #[test]
    fn transfer_of_non_positive_amount_rejected() {
        let portfolio = opened("p");
        assert!(matches!(
            portfolio.credit_funds(Money::ZERO).unwrap_err(),
            PortfolioError::InvalidTransfer { .. }
        ));
        assert!(matches!(
            portfolio.debit_funds(Money::new(dec!(-5))).unwrap_err(),
            PortfolioError::InvalidTransfer { .. }
        ));
    }

    #[test]
    fn replay_rebuilds_identical_state() {
        let mut portfolio = opened("p");
        let mut journal = Portfolio::open(portfolio.id().clone(), "p");
        portfolio = Portfolio::replay(journal.iter()).unwrap();

        let (buy, events) = portfolio.place_order(buy_details("IBM", 31)).unwrap();
        apply_all(&mut portfolio, &events);
        journal.extend(events);

        let result = fulfilled(&portfolio.clone(), &buy, Money::new(dec!(152.12)));
        let events = portfolio.apply_order_result(&result).unwrap();
        apply_all(&mut portfolio, &events);
        journal.extend(events);

        let (sell, events) = portfolio.place_order(sell_details("IBM", 10)).unwrap();
        apply_all(&mut portfolio, &events);
        journal.extend(events);

        let events = portfolio
            .apply_order_result(&failed(&portfolio, &sell))
            .unwrap();
        apply_all(&mut portfolio, &events);
        journal.extend(events);

        let rebuilt = Portfolio::replay(journal.iter()).unwrap();
        assert_eq!(rebuilt.funds(), portfolio.funds());
        assert_eq!(rebuilt.holdings(), portfolio.holdings());
        assert_eq!(rebuilt.lifecycle(), portfolio.lifecycle());
        assert_eq!(rebuilt.loyalty_level(), portfolio.loyalty_level());
    }

    #[test]
    fn replay_of_empty_journal_is_none() {
        assert!(Portfolio::replay(std::iter::empty()).is_none());
    }

    proptest! {
        /// Any interleaving of placements and outcomes keeps every holding
        /// non-negative (counts are unsigned; the property is that decide
        /// and apply never disagree about availability).
        #[test]
        fn holdings_never_go_negative(ops in proptest::collection::vec((0u8..4, 1u64..50), 1..40)) {
            let mut portfolio = opened("prop");
            let mut pending: Vec<OrderId> = Vec::new();

            for (op, count) in ops {
                match op {
                    0 => {
                        let id = place(&mut portfolio, buy_details("IBM", count));
                        pending.push(id);
                    }
                    1 => {
                        if let Ok((id, events)) = portfolio.place_order(sell_details("IBM", count)) {
                            apply_all(&mut portfolio, &events);
                            pending.push(id);
                        }
                    }
                    2 => {
                        if let Some(id) = pending.pop() {
                            let result = fulfilled(&portfolio.clone(), &id, Money::new(dec!(10)));
                            deliver(&mut portfolio, &result);
                        }
                    }
                    _ => {
                        if let Some(id) = pending.pop() {
                            let result = failed(&portfolio, &id);
                            deliver(&mut portfolio, &result);
                        }
                    }
                }
                // ShareCount is unsigned; additionally check the zero-entry
                // pruning invariant.
                for holding in portfolio.holdings() {
                    prop_assert!(!holding.share_count.is_zero());
                }
            }
        }
    }
}
