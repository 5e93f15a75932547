//! Order Publisher
//!
//! Tails the global event log and republishes every placed order onto the
//! order bus. The checkpoint for an offset is saved only after the publish
//! at that offset is acknowledged, so a crash replays from the last acked
//! position. Duplicates on the bus are possible and expected; effect-once
//! comes from consumer-side dedup on order id.
//!
//! Orders are published strictly in log order and a failed publish is
//! retried in place, never skipped.

use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::application::ports::{CheckpointStorePort, EventStorePort, OrderBusPort};
use crate::domain::portfolio::value_objects::Order;
use crate::domain::portfolio::PortfolioEvent;
use crate::infrastructure::config::PublisherConfig;
use crate::infrastructure::retry::BackoffPolicy;

/// Checkpoint key for this consumer.
const CONSUMER: &str = "order-publisher";

/// Checkpointed tail of the event log, publishing placed orders.
pub struct OrderPublisher<S, B, C> {
    store: Arc<S>,
    bus: Arc<B>,
    checkpoints: Arc<C>,
    config: PublisherConfig,
    cancel: CancellationToken,
}

impl<S, B, C> OrderPublisher<S, B, C>
where
    S: EventStorePort,
    B: OrderBusPort,
    C: CheckpointStorePort,
{
    /// Create a publisher.
    pub fn new(
        store: Arc<S>,
        bus: Arc<B>,
        checkpoints: Arc<C>,
        config: PublisherConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            bus,
            checkpoints,
            config,
            cancel,
        }
    }

    /// Run until cancelled.
    pub async fn run(self) {
        let Some(mut offset) = self.load_checkpoint().await else {
            return;
        };
        debug!(offset, "order publisher started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            match self.store.read_after(offset, self.config.batch_size).await {
                Ok(batch) if batch.is_empty() => {
                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = sleep(self.config.poll_interval) => {}
                    }
                }
                Ok(batch) => {
                    for record in batch {
                        if let PortfolioEvent::OrderPlaced(placed) = &record.event {
                            if !self.publish_until_acked(&placed.order).await {
                                return;
                            }
                        }
                        offset = record.offset;
                        if let Err(err) = self.checkpoints.save(CONSUMER, offset).await {
                            // Worst case the restart republishes; consumers dedup.
                            warn!(error = %err, offset, "checkpoint save failed");
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "event log read failed");
                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = sleep(self.config.poll_interval) => {}
                    }
                }
            }
        }
        debug!("order publisher stopped");
    }

    /// Initial offset, retried until the checkpoint store answers.
    ///
    /// `None` means shutdown was requested first.
    async fn load_checkpoint(&self) -> Option<u64> {
        let mut backoff = BackoffPolicy::default();
        loop {
            match self.checkpoints.load(CONSUMER).await {
                Ok(saved) => return Some(saved.unwrap_or(0)),
                Err(err) => {
                    let delay = backoff.next_backoff().unwrap_or_else(|| {
                        backoff.reset();
                        self.config.poll_interval
                    });
                    warn!(error = %err, "checkpoint load failed, retrying");
                    tokio::select! {
                        () = self.cancel.cancelled() => return None,
                        () = sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Publish one order, retrying until the bus acknowledges it.
    ///
    /// Returns false when shutdown was requested before the ack.
    async fn publish_until_acked(&self, order: &Order) -> bool {
        let mut backoff = BackoffPolicy::default();
        loop {
            match self.bus.publish(order).await {
                Ok(()) => {
                    debug!(order_id = %order.order_id, "order published");
                    return true;
                }
                Err(err) => {
                    let delay = backoff.next_backoff().unwrap_or_else(|| {
                        error!(
                            order_id = %order.order_id,
                            error = %err,
                            "order publish still failing, continuing to retry"
                        );
                        backoff.reset();
                        self.config.poll_interval
                    });
                    warn!(order_id = %order.order_id, error = %err, "order publish failed");
                    tokio::select! {
                        () = self.cancel.cancelled() => return false,
                        () = sleep(delay) => {}
                    }
                }
            }
        }
    }
}
