//! Order Bus Port
//!
//! Outbound edge for placed orders. The substrate is at-least-once: a
//! publish acknowledged here may still be seen more than once downstream,
//! and consumers are expected to dedup on order id.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::domain::portfolio::value_objects::Order;

/// Errors from the order bus.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// Publish was not acknowledged.
    #[error("order publish failed: {message}")]
    Publish {
        /// Transport-specific description.
        message: String,
    },

    /// The bus has shut down.
    #[error("order bus is closed")]
    Closed,
}

/// Port for publishing placed orders to the settlement side.
#[async_trait]
pub trait OrderBusPort: Send + Sync {
    /// Publish one order. Returns once the substrate acknowledges it.
    ///
    /// # Errors
    ///
    /// `Publish` when the substrate rejects or loses the message, `Closed`
    /// after shutdown.
    async fn publish(&self, order: &Order) -> Result<(), BusError>;
}

/// No-op bus for local development and tests that only exercise the
/// aggregate side.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpOrderBus;

#[async_trait]
impl OrderBusPort for NoOpOrderBus {
    async fn publish(&self, order: &Order) -> Result<(), BusError> {
        debug!(order_id = %order.order_id, "order publish skipped (no-op bus)");
        Ok(())
    }
}
