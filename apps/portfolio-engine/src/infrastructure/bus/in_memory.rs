//! In-memory order bus and trade-result queue.
//!
//! Process-local messaging with the same delivery contract as a broker:
//! publishes are acknowledged, trade results are at-least-once with
//! per-delivery ack/nack, and a nacked delivery comes back under a fresh
//! tag. Tests use the injectable failure counter to exercise retry paths.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::debug;

use crate::application::ports::{
    BusError, OrderBusPort, TradeResultDelivery, TradeResultSourcePort,
};
use crate::domain::portfolio::value_objects::{Order, OrderResult};

/// In-memory order bus.
///
/// Keeps every published order for inspection and optionally forwards them
/// to a channel (the settlement side in the demo binary).
#[derive(Debug, Default)]
pub struct InMemoryOrderBus {
    published: RwLock<Vec<Order>>,
    sink: Option<mpsc::UnboundedSender<Order>>,
    failures_remaining: AtomicU32,
}

impl InMemoryOrderBus {
    /// Create a bus that only records publishes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus that also forwards each publish to a channel.
    #[must_use]
    pub fn with_channel() -> (Self, mpsc::UnboundedReceiver<Order>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bus = Self {
            published: RwLock::new(Vec::new()),
            sink: Some(tx),
            failures_remaining: AtomicU32::new(0),
        };
        (bus, rx)
    }

    /// Fail the next `count` publishes with a transient error.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Every order published so far, duplicates included.
    pub async fn published(&self) -> Vec<Order> {
        self.published.read().await.clone()
    }
}

#[async_trait]
impl OrderBusPort for InMemoryOrderBus {
    async fn publish(&self, order: &Order) -> Result<(), BusError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .failures_remaining
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(BusError::Publish {
                message: "injected transient failure".to_string(),
            });
        }

        self.published.write().await.push(order.clone());
        if let Some(sink) = &self.sink {
            sink.send(order.clone()).map_err(|_| BusError::Closed)?;
        }
        debug!(order_id = %order.order_id, "order published");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct QueueInner {
    pending: VecDeque<(u64, OrderResult)>,
    in_flight: HashMap<u64, OrderResult>,
    next_tag: u64,
    closed: bool,
}

/// In-memory at-least-once trade-result queue.
#[derive(Debug, Default)]
pub struct InMemoryTradeResultQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
}

impl InMemoryTradeResultQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a result for delivery.
    ///
    /// Pushing the same result twice models a duplicate from the substrate.
    pub async fn push(&self, result: OrderResult) {
        let mut inner = self.inner.lock().await;
        inner.next_tag += 1;
        let tag = inner.next_tag;
        inner.pending.push_back((tag, result));
        drop(inner);
        self.notify.notify_one();
    }

    /// Close the queue; consumers drain what is pending and then get `None`.
    pub async fn close(&self) {
        self.inner.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    /// Deliveries handed out but not yet acked or nacked.
    pub async fn in_flight(&self) -> usize {
        self.inner.lock().await.in_flight.len()
    }

    /// True when nothing is pending or awaiting acknowledgment.
    pub async fn is_idle(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.pending.is_empty() && inner.in_flight.is_empty()
    }
}

#[async_trait]
impl TradeResultSourcePort for InMemoryTradeResultQueue {
    async fn next(&self) -> Option<TradeResultDelivery> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock().await;
                if let Some((tag, result)) = inner.pending.pop_front() {
                    inner.in_flight.insert(tag, result.clone());
                    return Some(TradeResultDelivery { tag, result });
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    async fn ack(&self, tag: u64) {
        self.inner.lock().await.in_flight.remove(&tag);
    }

    async fn nack(&self, tag: u64) {
        let mut inner = self.inner.lock().await;
        if let Some(result) = inner.in_flight.remove(&tag) {
            inner.next_tag += 1;
            let fresh = inner.next_tag;
            inner.pending.push_back((fresh, result));
            drop(inner);
            self.notify.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::{OrderId, PortfolioId};

    fn failed_result() -> OrderResult {
        OrderResult::Failed {
            order_id: OrderId::generate(),
            portfolio_id: PortfolioId::generate(),
        }
    }

    #[tokio::test]
    async fn bus_records_publishes_in_order() {
        let bus = InMemoryOrderBus::new();
        let order = Order::placed(
            OrderId::new("ord-1"),
            PortfolioId::new("pf-1"),
            crate::domain::portfolio::value_objects::OrderDetails::market(
                crate::domain::shared::Symbol::new("IBM"),
                crate::domain::shared::ShareCount::new(1),
                crate::domain::portfolio::value_objects::OrderType::Buy,
            ),
        );

        bus.publish(&order).await.unwrap();
        bus.publish(&order).await.unwrap();
        assert_eq!(bus.published().await.len(), 2);
    }

    #[tokio::test]
    async fn bus_injected_failures_then_recovers() {
        let bus = InMemoryOrderBus::new();
        bus.fail_next(2);
        let order = Order::placed(
            OrderId::new("ord-1"),
            PortfolioId::new("pf-1"),
            crate::domain::portfolio::value_objects::OrderDetails::market(
                crate::domain::shared::Symbol::new("IBM"),
                crate::domain::shared::ShareCount::new(1),
                crate::domain::portfolio::value_objects::OrderType::Buy,
            ),
        );

        assert!(bus.publish(&order).await.is_err());
        assert!(bus.publish(&order).await.is_err());
        assert!(bus.publish(&order).await.is_ok());
        assert_eq!(bus.published().await.len(), 1);
    }

    #[tokio::test]
    async fn queue_delivers_then_ack_removes() {
        let queue = InMemoryTradeResultQueue::new();
        queue.push(failed_result()).await;

        let delivery = queue.next().await.unwrap();
        assert_eq!(queue.in_flight().await, 1);

        queue.ack(delivery.tag).await;
        assert_eq!(queue.in_flight().await, 0);

        queue.close().await;
        assert!(queue.next().await.is_none());
    }

    #[tokio::test]
    async fn nacked_delivery_comes_back_with_fresh_tag() {
        let queue = InMemoryTradeResultQueue::new();
        let result = failed_result();
        queue.push(result.clone()).await;

        let first = queue.next().await.unwrap();
        queue.nack(first.tag).await;

        let second = queue.next().await.unwrap();
        assert_ne!(first.tag, second.tag);
        assert_eq!(second.result, result);
    }

    #[tokio::test]
    async fn close_drains_pending_before_ending() {
        let queue = InMemoryTradeResultQueue::new();
        queue.push(failed_result()).await;
        queue.close().await;

        assert!(queue.next().await.is_some());
        assert!(queue.next().await.is_none());
    }
}
