//! Per-portfolio worker task.
//!
//! One task owns one portfolio: it replays the journal once at startup and
//! then serializes every command for that id. Decide, append, apply — in
//! that order, so an event is only folded into in-memory state after it is
//! durable. A version conflict means something else wrote our journal;
//! the worker refreshes from the store and re-decides.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::application::ports::{EventStoreError, EventStorePort};
use crate::application::services::portfolio_service::{PortfolioView, ServiceError};
use crate::domain::portfolio::value_objects::{OrderDetails, OrderResult};
use crate::domain::portfolio::{Portfolio, PortfolioError, PortfolioEvent};
use crate::domain::shared::{Money, OrderId, PortfolioId};

/// Re-decide attempts after a version conflict before giving up.
const MAX_COMMIT_ATTEMPTS: u32 = 3;

type Reply<T> = oneshot::Sender<Result<T, ServiceError>>;

/// Commands routed to a portfolio's worker.
pub(crate) enum Command {
    PlaceOrder {
        details: OrderDetails,
        reply: Reply<OrderId>,
    },
    ApplyOrderResult {
        result: OrderResult,
        reply: Reply<()>,
    },
    Liquidate {
        reply: Reply<()>,
    },
    CreditFunds {
        amount: Money,
        reply: Reply<()>,
    },
    DebitFunds {
        amount: Money,
        reply: Reply<()>,
    },
    View {
        reply: Reply<PortfolioView>,
    },
}

pub(crate) struct Worker<S> {
    portfolio_id: PortfolioId,
    store: Arc<S>,
    state: Portfolio,
    version: u64,
}

impl<S> Worker<S>
where
    S: EventStorePort,
{
    pub(crate) fn new(portfolio_id: PortfolioId, store: Arc<S>, state: Portfolio, version: u64) -> Self {
        Self {
            portfolio_id,
            store,
            state,
            version,
        }
    }

    /// Drain commands until every sender is dropped.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!(portfolio_id = %self.portfolio_id, version = self.version, "portfolio worker started");
        while let Some(command) = commands.recv().await {
            self.handle(command).await;
        }
        debug!(portfolio_id = %self.portfolio_id, "portfolio worker stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::PlaceOrder { details, reply } => {
                let outcome = self
                    .execute(|p| p.place_order(details.clone()))
                    .await;
                let _ = reply.send(outcome);
            }
            Command::ApplyOrderResult { result, reply } => {
                let outcome = self
                    .execute(|p| p.apply_order_result(&result).map(|ev| ((), ev)))
                    .await;
                let _ = reply.send(outcome);
            }
            Command::Liquidate { reply } => {
                let outcome = self.execute(|p| p.liquidate().map(|ev| ((), ev))).await;
                let _ = reply.send(outcome);
            }
            Command::CreditFunds { amount, reply } => {
                let outcome = self
                    .execute(|p| p.credit_funds(amount).map(|ev| ((), ev)))
                    .await;
                let _ = reply.send(outcome);
            }
            Command::DebitFunds { amount, reply } => {
                let outcome = self
                    .execute(|p| p.debit_funds(amount).map(|ev| ((), ev)))
                    .await;
                let _ = reply.send(outcome);
            }
            Command::View { reply } => {
                let _ = reply.send(Ok(PortfolioView::from_portfolio(&self.state)));
            }
        }
    }

    /// Run one decision against current state and commit its events.
    ///
    /// Re-decides against refreshed state on a version conflict, since the
    /// original decision may no longer hold.
    async fn execute<T>(
        &mut self,
        decide: impl Fn(&Portfolio) -> Result<(T, Vec<PortfolioEvent>), PortfolioError>,
    ) -> Result<T, ServiceError> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let (value, events) = decide(&self.state)?;
            if events.is_empty() {
                return Ok(value);
            }

            match self.store.append(&self.portfolio_id, self.version, &events).await {
                Ok(version) => {
                    for event in &events {
                        self.state.apply(event);
                    }
                    self.version = version;
                    debug!(
                        portfolio_id = %self.portfolio_id,
                        events = events.len(),
                        version,
                        "events committed"
                    );
                    return Ok(value);
                }
                Err(EventStoreError::VersionConflict { actual, .. }) => {
                    warn!(
                        portfolio_id = %self.portfolio_id,
                        expected = self.version,
                        actual,
                        attempt,
                        "journal version conflict, refreshing"
                    );
                    self.refresh().await?;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::CommitContention {
            portfolio_id: self.portfolio_id.clone(),
            attempts: MAX_COMMIT_ATTEMPTS,
        })
    }

    async fn refresh(&mut self) -> Result<(), ServiceError> {
        let events = self.store.load(&self.portfolio_id).await?;
        let state =
            Portfolio::replay(events.iter()).ok_or_else(|| PortfolioError::NotOpened {
                portfolio_id: self.portfolio_id.clone(),
            })?;
        self.state = state;
        self.version = events.len() as u64;
        Ok(())
    }
}
