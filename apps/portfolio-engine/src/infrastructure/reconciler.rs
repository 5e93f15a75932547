//! Trade Result Reconciler
//!
//! Consumes trade results from the at-least-once source and applies them to
//! their portfolios. Acknowledgment discipline:
//!
//! - applied (or deduplicated) results are acked
//! - permanent rejections are acked after logging, so a poison message
//!   never wedges the queue
//! - transient failures are retried with backoff, then nacked back to the
//!   source for redelivery

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::application::ports::{EventStorePort, TradeResultDelivery, TradeResultSourcePort};
use crate::application::services::PortfolioService;
use crate::infrastructure::retry::BackoffPolicy;

/// Per-delivery retry budget before handing the message back to the source.
const RETRY_ATTEMPTS: u32 = 5;
const RETRY_INITIAL_BACKOFF: Duration = Duration::from_millis(50);
const RETRY_MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Settlement-side consumer applying trade results to portfolios.
pub struct TradeResultReconciler<S, R> {
    portfolios: Arc<PortfolioService<S>>,
    source: Arc<R>,
    cancel: CancellationToken,
}

impl<S, R> TradeResultReconciler<S, R>
where
    S: EventStorePort + Send + Sync + 'static,
    R: TradeResultSourcePort,
{
    /// Create a reconciler.
    pub fn new(
        portfolios: Arc<PortfolioService<S>>,
        source: Arc<R>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            portfolios,
            source,
            cancel,
        }
    }

    /// Run until the source ends or shutdown is requested.
    pub async fn run(self) {
        debug!("trade result reconciler started");
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                delivery = self.source.next() => {
                    let Some(delivery) = delivery else { break };
                    self.process(delivery).await;
                }
            }
        }
        debug!("trade result reconciler stopped");
    }

    async fn process(&self, delivery: TradeResultDelivery) {
        let mut backoff =
            BackoffPolicy::new(RETRY_INITIAL_BACKOFF, RETRY_MAX_BACKOFF, 2.0, RETRY_ATTEMPTS);
        loop {
            match self
                .portfolios
                .apply_order_result(delivery.result.clone())
                .await
            {
                Ok(()) => {
                    debug!(
                        order_id = %delivery.result.order_id(),
                        "trade result applied"
                    );
                    self.source.ack(delivery.tag).await;
                    return;
                }
                Err(err) if err.is_permanent() => {
                    warn!(
                        order_id = %delivery.result.order_id(),
                        portfolio_id = %delivery.result.portfolio_id(),
                        error = %err,
                        "trade result permanently rejected, dead-lettering"
                    );
                    self.source.ack(delivery.tag).await;
                    return;
                }
                Err(err) => {
                    let Some(delay) = backoff.next_backoff() else {
                        warn!(
                            order_id = %delivery.result.order_id(),
                            error = %err,
                            "retries exhausted, returning delivery to the source"
                        );
                        self.source.nack(delivery.tag).await;
                        return;
                    };
                    warn!(
                        order_id = %delivery.result.order_id(),
                        error = %err,
                        attempt = backoff.attempts(),
                        "trade result application failed, retrying"
                    );
                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            self.source.nack(delivery.tag).await;
                            return;
                        }
                        () = sleep(delay) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::value_objects::{OrderDetails, OrderResult, OrderType, Trade};
    use crate::domain::shared::{Money, OrderId, ShareCount, Symbol};
    use crate::infrastructure::bus::InMemoryTradeResultQueue;
    use crate::infrastructure::persistence::InMemoryEventStore;
    use rust_decimal_macros::dec;

    async fn engine() -> (
        Arc<PortfolioService<InMemoryEventStore>>,
        Arc<InMemoryTradeResultQueue>,
        CancellationToken,
        tokio::task::JoinHandle<()>,
    ) {
        let store = Arc::new(InMemoryEventStore::new());
        let portfolios = Arc::new(PortfolioService::new(store));
        let queue = Arc::new(InMemoryTradeResultQueue::new());
        let cancel = CancellationToken::new();

        let reconciler = TradeResultReconciler::new(
            Arc::clone(&portfolios),
            Arc::clone(&queue),
            cancel.clone(),
        );
        let handle = tokio::spawn(reconciler.run());
        (portfolios, queue, cancel, handle)
    }

    async fn wait_until_drained(queue: &InMemoryTradeResultQueue) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if queue.is_idle().await {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn applies_fulfilled_result_to_portfolio() {
        let (portfolios, queue, cancel, handle) = engine().await;

        let portfolio_id = portfolios.open_portfolio("p").await.unwrap();
        let order_id = portfolios
            .place_order(
                &portfolio_id,
                OrderDetails::market(Symbol::new("IBM"), ShareCount::new(31), OrderType::Buy),
            )
            .await
            .unwrap();

        queue
            .push(OrderResult::Fulfilled {
                order_id: order_id.clone(),
                portfolio_id: portfolio_id.clone(),
                trade: Trade {
                    order_id,
                    symbol: Symbol::new("IBM"),
                    share_count: ShareCount::new(31),
                    order_type: OrderType::Buy,
                    price: Money::new(dec!(152.12)),
                },
            })
            .await;

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let view = portfolios.portfolio(&portfolio_id).await.unwrap();
                if !view.holdings.is_empty() {
                    assert_eq!(view.funds, Money::new(dec!(-4715.72)));
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn permanent_rejection_is_acked_not_redelivered() {
        let (portfolios, queue, cancel, handle) = engine().await;

        let portfolio_id = portfolios.open_portfolio("p").await.unwrap();
        // Result for an order this portfolio never placed.
        queue
            .push(OrderResult::Failed {
                order_id: OrderId::new("ghost"),
                portfolio_id,
            })
            .await;

        wait_until_drained(&queue).await;
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_delivery_is_acked_without_effect() {
        let (portfolios, queue, cancel, handle) = engine().await;

        let portfolio_id = portfolios.open_portfolio("p").await.unwrap();
        let order_id = portfolios
            .place_order(
                &portfolio_id,
                OrderDetails::market(Symbol::new("IBM"), ShareCount::new(5), OrderType::Buy),
            )
            .await
            .unwrap();

        let result = OrderResult::Fulfilled {
            order_id: order_id.clone(),
            portfolio_id: portfolio_id.clone(),
            trade: Trade {
                order_id,
                symbol: Symbol::new("IBM"),
                share_count: ShareCount::new(5),
                order_type: OrderType::Buy,
                price: Money::new(dec!(10)),
            },
        };
        queue.push(result.clone()).await;
        queue.push(result).await;

        wait_until_drained(&queue).await;

        let view = portfolios.portfolio(&portfolio_id).await.unwrap();
        assert_eq!(view.funds, Money::new(dec!(-50)));
        assert_eq!(view.holdings.len(), 1);
        assert_eq!(view.holdings[0].share_count, ShareCount::new(5));
        assert_eq!(view.loyalty_level.level(), 1);

        cancel.cancel();
        handle.await.unwrap();
    }
}
