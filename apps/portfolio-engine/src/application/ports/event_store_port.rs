//! Event Store Port
//!
//! The append-only journal backing every portfolio. Each portfolio owns an
//! ordered stream of events; appends are guarded by an expected-version
//! check so a stale writer can never interleave. A global offset across all
//! journals feeds the order publisher.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::portfolio::PortfolioEvent;
use crate::domain::shared::PortfolioId;

/// An event as persisted, with its addressing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Position in the global (all-portfolios) log, strictly increasing.
    pub offset: u64,
    /// Owning portfolio.
    pub portfolio_id: PortfolioId,
    /// Position within the portfolio's journal, starting at 1.
    pub sequence: u64,
    /// The event itself.
    pub event: PortfolioEvent,
}

/// Errors from the event store.
#[derive(Debug, Clone, Error)]
pub enum EventStoreError {
    /// Append raced another writer for the same journal.
    #[error(
        "version conflict on portfolio {portfolio_id}: expected {expected}, found {actual}"
    )]
    VersionConflict {
        /// Contended portfolio.
        portfolio_id: PortfolioId,
        /// Version the writer decided against.
        expected: u64,
        /// Version actually persisted.
        actual: u64,
    },

    /// The backing store failed.
    #[error("event store backend error: {message}")]
    Backend {
        /// Backend-specific description.
        message: String,
    },
}

/// Port for the append-only event journal.
#[async_trait]
pub trait EventStorePort: Send + Sync {
    /// Append events to one portfolio's journal.
    ///
    /// `expected_version` is the number of events the writer believes the
    /// journal already holds; zero creates the journal. Returns the new
    /// version. All events land atomically or none do.
    ///
    /// # Errors
    ///
    /// `VersionConflict` when the journal moved past `expected_version`,
    /// `Backend` on storage failure.
    async fn append(
        &self,
        portfolio_id: &PortfolioId,
        expected_version: u64,
        events: &[PortfolioEvent],
    ) -> Result<u64, EventStoreError>;

    /// Load one portfolio's full journal in sequence order.
    ///
    /// An id with no journal yields an empty vector.
    ///
    /// # Errors
    ///
    /// `Backend` on storage failure.
    async fn load(&self, portfolio_id: &PortfolioId) -> Result<Vec<PortfolioEvent>, EventStoreError>;

    /// Read up to `max` events from the global log after `offset`.
    ///
    /// Ordering is total and stable: re-reading the same range yields the
    /// same records. Used by the order publisher to tail the log.
    ///
    /// # Errors
    ///
    /// `Backend` on storage failure.
    async fn read_after(
        &self,
        offset: u64,
        max: usize,
    ) -> Result<Vec<RecordedEvent>, EventStoreError>;
}
