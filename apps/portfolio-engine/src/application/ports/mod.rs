//! Ports
//!
//! Trait seams the application services depend on. Adapters live in the
//! infrastructure layer.

pub mod checkpoint_store_port;
pub mod event_store_port;
pub mod order_bus_port;
pub mod quote_provider_port;
pub mod trade_result_port;

pub use checkpoint_store_port::{CheckpointError, CheckpointStorePort};
pub use event_store_port::{EventStoreError, EventStorePort, RecordedEvent};
pub use order_bus_port::{BusError, NoOpOrderBus, OrderBusPort};
pub use quote_provider_port::{Quote, QuoteError, QuoteProviderPort};
pub use trade_result_port::{TradeResultDelivery, TradeResultSourcePort};
