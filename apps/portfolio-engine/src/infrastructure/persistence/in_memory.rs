//! In-memory event and checkpoint stores.
//!
//! Process-local adapters for development and tests. The event store keeps
//! one journal per portfolio plus a single global log whose offsets are
//! strictly increasing; semantics (versioned append, stable range reads)
//! match what a durable backend must provide.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::{
    CheckpointError, CheckpointStorePort, EventStoreError, EventStorePort, RecordedEvent,
};
use crate::domain::portfolio::PortfolioEvent;
use crate::domain::shared::PortfolioId;

#[derive(Default)]
struct StoreInner {
    journals: HashMap<PortfolioId, Vec<PortfolioEvent>>,
    log: Vec<RecordedEvent>,
}

/// In-memory append-only event store.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total events across all journals.
    pub async fn global_length(&self) -> u64 {
        self.inner.read().await.log.len() as u64
    }
}

#[async_trait]
impl EventStorePort for InMemoryEventStore {
    async fn append(
        &self,
        portfolio_id: &PortfolioId,
        expected_version: u64,
        events: &[PortfolioEvent],
    ) -> Result<u64, EventStoreError> {
        let mut inner = self.inner.write().await;
        let actual = inner
            .journals
            .get(portfolio_id)
            .map_or(0, |journal| journal.len() as u64);
        if actual != expected_version {
            return Err(EventStoreError::VersionConflict {
                portfolio_id: portfolio_id.clone(),
                expected: expected_version,
                actual,
            });
        }

        let mut sequence = actual;
        for event in events {
            sequence += 1;
            let offset = inner.log.len() as u64 + 1;
            inner.log.push(RecordedEvent {
                offset,
                portfolio_id: portfolio_id.clone(),
                sequence,
                event: event.clone(),
            });
        }
        inner
            .journals
            .entry(portfolio_id.clone())
            .or_default()
            .extend_from_slice(events);
        Ok(sequence)
    }

    async fn load(
        &self,
        portfolio_id: &PortfolioId,
    ) -> Result<Vec<PortfolioEvent>, EventStoreError> {
        let inner = self.inner.read().await;
        Ok(inner.journals.get(portfolio_id).cloned().unwrap_or_default())
    }

    async fn read_after(
        &self,
        offset: u64,
        max: usize,
    ) -> Result<Vec<RecordedEvent>, EventStoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .log
            .iter()
            .filter(|record| record.offset > offset)
            .take(max)
            .cloned()
            .collect())
    }
}

/// In-memory per-consumer checkpoint store.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    offsets: RwLock<HashMap<String, u64>>,
}

impl InMemoryCheckpointStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStorePort for InMemoryCheckpointStore {
    async fn load(&self, consumer: &str) -> Result<Option<u64>, CheckpointError> {
        Ok(self.offsets.read().await.get(consumer).copied())
    }

    async fn save(&self, consumer: &str, offset: u64) -> Result<(), CheckpointError> {
        self.offsets.write().await.insert(consumer.to_string(), offset);
        Ok(())
    }
}
