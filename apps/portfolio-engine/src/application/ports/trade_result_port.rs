//! Trade Result Source Port
//!
//! Inbound edge for trade outcomes. Delivery is at-least-once with
//! per-delivery acknowledgment: an unacknowledged or negatively
//! acknowledged delivery comes back again.

use async_trait::async_trait;

use crate::domain::portfolio::value_objects::OrderResult;

/// One delivery of a trade result.
///
/// The tag identifies this delivery (not the result: a redelivered result
/// carries a fresh tag) and is passed back to `ack` or `nack`.
#[derive(Debug, Clone)]
pub struct TradeResultDelivery {
    /// Delivery tag for acknowledgment.
    pub tag: u64,
    /// The trade outcome.
    pub result: OrderResult,
}

/// Port for consuming trade results.
#[async_trait]
pub trait TradeResultSourcePort: Send + Sync {
    /// Wait for the next delivery. `None` means the source has shut down.
    async fn next(&self) -> Option<TradeResultDelivery>;

    /// Acknowledge a delivery; it will not be seen again.
    async fn ack(&self, tag: u64);

    /// Reject a delivery; it will be redelivered.
    async fn nack(&self, tag: u64);
}
