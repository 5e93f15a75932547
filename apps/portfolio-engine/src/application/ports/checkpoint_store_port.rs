//! Checkpoint Store Port
//!
//! Durable per-consumer offsets into the global event log. A checkpoint is
//! saved only after the work at that offset succeeded, so a crash replays
//! from the last acknowledged position (at-least-once).

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the checkpoint store.
#[derive(Debug, Clone, Error)]
pub enum CheckpointError {
    /// The backing store failed.
    #[error("checkpoint store backend error: {message}")]
    Backend {
        /// Backend-specific description.
        message: String,
    },
}

/// Port for consumer checkpoints.
#[async_trait]
pub trait CheckpointStorePort: Send + Sync {
    /// Last saved offset for a consumer, if any.
    ///
    /// # Errors
    ///
    /// `Backend` on storage failure.
    async fn load(&self, consumer: &str) -> Result<Option<u64>, CheckpointError>;

    /// Persist a consumer's offset.
    ///
    /// # Errors
    ///
    /// `Backend` on storage failure.
    async fn save(&self, consumer: &str, offset: u64) -> Result<(), CheckpointError>;
}
