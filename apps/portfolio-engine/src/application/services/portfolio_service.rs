//! Portfolio Service
//!
//! The command-side API. Routes every command for a given portfolio id to
//! that portfolio's single worker task, so state transitions for one id are
//! strictly serialized while different portfolios proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{info, warn};

use crate::application::ports::{EventStoreError, EventStorePort};
use crate::application::services::worker::{Command, Worker};
use crate::domain::portfolio::value_objects::{
    Holding, LifecycleState, LoyaltyLevel, OrderDetails, OrderResult,
};
use crate::domain::portfolio::{Portfolio, PortfolioError};
use crate::domain::shared::{Money, OrderId, PortfolioId};

/// Fresh-id attempts when opening before giving up.
const OPEN_ATTEMPTS: u32 = 5;

/// Per-worker command buffer.
const COMMAND_BUFFER: usize = 64;

/// Errors from the portfolio service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The aggregate rejected the command.
    #[error(transparent)]
    Domain(#[from] PortfolioError),

    /// The event store failed.
    #[error(transparent)]
    Store(#[from] EventStoreError),

    /// Could not allocate an unused portfolio id.
    #[error("could not allocate a unique portfolio id after {attempts} attempts")]
    CreationExhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// Repeated version conflicts exhausted the commit retries.
    #[error("journal for {portfolio_id} stayed contended after {attempts} attempts")]
    CommitContention {
        /// Contended portfolio.
        portfolio_id: PortfolioId,
        /// Attempts made.
        attempts: u32,
    },

    /// The worker task is gone (shutdown or panic).
    #[error("portfolio worker unavailable")]
    WorkerUnavailable,
}

impl ServiceError {
    /// Returns true when redelivering the same command can never succeed.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        match self {
            Self::Domain(err) => err.is_permanent(),
            Self::Store(_)
            | Self::CreationExhausted { .. }
            | Self::CommitContention { .. }
            | Self::WorkerUnavailable => false,
        }
    }
}

/// Read model of one portfolio, taken from its worker's current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioView {
    /// Portfolio id.
    pub portfolio_id: PortfolioId,
    /// Display name.
    pub name: String,
    /// Current funds; negative means overdrawn.
    pub funds: Money,
    /// Settled-trade counter.
    pub loyalty_level: LoyaltyLevel,
    /// Lifecycle state.
    pub lifecycle: LifecycleState,
    /// Holdings in symbol order. Reserved shares are already excluded.
    pub holdings: Vec<Holding>,
}

impl PortfolioView {
    pub(crate) fn from_portfolio(portfolio: &Portfolio) -> Self {
        Self {
            portfolio_id: portfolio.id().clone(),
            name: portfolio.name().to_string(),
            funds: portfolio.funds(),
            loyalty_level: portfolio.loyalty_level(),
            lifecycle: portfolio.lifecycle(),
            holdings: portfolio.holdings(),
        }
    }
}

/// Command-side portfolio API with per-id exclusive processing.
pub struct PortfolioService<S> {
    store: Arc<S>,
    workers: Mutex<HashMap<PortfolioId, mpsc::Sender<Command>>>,
}

impl<S> PortfolioService<S>
where
    S: EventStorePort + Send + Sync + 'static,
{
    /// Create the service over an event store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Open a new portfolio under a generated id.
    ///
    /// The opening event is appended at version zero; a conflict there means
    /// the generated id is already taken, so a fresh id is tried. Exhausting
    /// all attempts is reported rather than retried forever.
    ///
    /// # Errors
    ///
    /// `CreationExhausted` after repeated id collisions, `Store` on storage
    /// failure.
    pub async fn open_portfolio(&self, name: &str) -> Result<PortfolioId, ServiceError> {
        for attempt in 1..=OPEN_ATTEMPTS {
            let portfolio_id = PortfolioId::generate();
            let events = Portfolio::open(portfolio_id.clone(), name);
            match self.store.append(&portfolio_id, 0, &events).await {
                Ok(_) => {
                    info!(portfolio_id = %portfolio_id, name, "portfolio opened");
                    return Ok(portfolio_id);
                }
                Err(EventStoreError::VersionConflict { .. }) => {
                    warn!(attempt, "portfolio id collision, generating a new id");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::CreationExhausted {
            attempts: OPEN_ATTEMPTS,
        })
    }

    /// Place an order against a portfolio.
    ///
    /// Returns once the placement is journaled; publication to the order bus
    /// happens asynchronously from the journal.
    ///
    /// # Errors
    ///
    /// Aggregate rejections (`Domain`), unknown ids (`Domain(NotOpened)`),
    /// storage failures.
    pub async fn place_order(
        &self,
        portfolio_id: &PortfolioId,
        details: OrderDetails,
    ) -> Result<OrderId, ServiceError> {
        self.send(portfolio_id, |reply| Command::PlaceOrder { details, reply })
            .await
    }

    /// Apply a trade outcome to its portfolio. Idempotent on order id.
    ///
    /// # Errors
    ///
    /// Aggregate rejections (`Domain`), storage failures.
    pub async fn apply_order_result(&self, result: OrderResult) -> Result<(), ServiceError> {
        let portfolio_id = result.portfolio_id().clone();
        self.send(&portfolio_id, |reply| Command::ApplyOrderResult {
            result,
            reply,
        })
        .await
    }

    /// Start liquidating a portfolio.
    ///
    /// # Errors
    ///
    /// `Domain(PortfolioClosed)` after closure, storage failures.
    pub async fn liquidate(&self, portfolio_id: &PortfolioId) -> Result<(), ServiceError> {
        self.send(portfolio_id, |reply| Command::Liquidate { reply })
            .await
    }

    /// Transfer funds into a portfolio.
    ///
    /// # Errors
    ///
    /// `Domain(InvalidTransfer)` for non-positive amounts, lifecycle and
    /// storage failures.
    pub async fn credit_funds(
        &self,
        portfolio_id: &PortfolioId,
        amount: Money,
    ) -> Result<(), ServiceError> {
        self.send(portfolio_id, |reply| Command::CreditFunds { amount, reply })
            .await
    }

    /// Transfer funds out of a portfolio.
    ///
    /// # Errors
    ///
    /// `Domain(InsufficientFunds)` when the balance cannot cover the debit,
    /// lifecycle and storage failures.
    pub async fn debit_funds(
        &self,
        portfolio_id: &PortfolioId,
        amount: Money,
    ) -> Result<(), ServiceError> {
        self.send(portfolio_id, |reply| Command::DebitFunds { amount, reply })
            .await
    }

    /// Current state of a portfolio.
    ///
    /// Served by the portfolio's worker, so the view reflects every command
    /// committed before this call.
    ///
    /// # Errors
    ///
    /// `Domain(NotOpened)` for unknown ids, storage failures.
    pub async fn portfolio(&self, portfolio_id: &PortfolioId) -> Result<PortfolioView, ServiceError> {
        self.send(portfolio_id, |reply| Command::View { reply }).await
    }

    async fn send<T>(
        &self,
        portfolio_id: &PortfolioId,
        make: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> Command,
    ) -> Result<T, ServiceError> {
        let sender = self.worker_sender(portfolio_id).await?;
        let (reply_tx, reply_rx) = oneshot::channel();
        sender
            .send(make(reply_tx))
            .await
            .map_err(|_| ServiceError::WorkerUnavailable)?;
        reply_rx.await.map_err(|_| ServiceError::WorkerUnavailable)?
    }

    /// The worker channel for an id, spawning the worker on first use.
    ///
    /// The journal is loaded outside the routing table lock, so a long
    /// replay for one portfolio never stalls dispatch to the others. Two
    /// callers racing on the same first contact both load; the table is
    /// re-checked under the lock before spawning, so only one worker wins
    /// and the loser's replay is discarded.
    async fn worker_sender(
        &self,
        portfolio_id: &PortfolioId,
    ) -> Result<mpsc::Sender<Command>, ServiceError> {
        if let Some(sender) = self.live_sender(portfolio_id).await {
            return Ok(sender);
        }

        let events = self.store.load(portfolio_id).await?;
        let state = Portfolio::replay(events.iter()).ok_or_else(|| {
            ServiceError::Domain(PortfolioError::NotOpened {
                portfolio_id: portfolio_id.clone(),
            })
        })?;
        let version = events.len() as u64;

        let mut workers = self.workers.lock().await;
        if let Some(sender) = workers.get(portfolio_id) {
            if !sender.is_closed() {
                return Ok(sender.clone());
            }
        }

        let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
        let worker = Worker::new(
            portfolio_id.clone(),
            Arc::clone(&self.store),
            state,
            version,
        );
        tokio::spawn(worker.run(receiver));
        workers.insert(portfolio_id.clone(), sender.clone());
        Ok(sender)
    }

    async fn live_sender(&self, portfolio_id: &PortfolioId) -> Option<mpsc::Sender<Command>> {
        let workers = self.workers.lock().await;
        workers
            .get(portfolio_id)
            .filter(|sender| !sender.is_closed())
            .cloned()
    }
}
