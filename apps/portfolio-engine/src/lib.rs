// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Portfolio Engine - Rust Core Library
//!
//! Event-sourced portfolio management core for the Folio system.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (aggregates, value objects, domain events)
//!   - `portfolio`: Portfolio aggregate, order lifecycle, settlement and
//!     compensation, liquidation
//!   - `shared`: Identifiers, `Money`, `ShareCount`, `Symbol`, `Timestamp`
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`EventStorePort`,
//!     `OrderBusPort`, `QuoteProviderPort`, `TradeResultSourcePort`)
//!   - `services`: `PortfolioService` (per-id exclusive command routing),
//!     `ValuationService` (concurrent quote fan-out)
//!   - `use_cases`: `get_valued_portfolio`
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `persistence`: In-memory event and checkpoint stores
//!   - `bus`: In-memory order bus and at-least-once trade-result queue
//!   - `publisher` / `reconciler`: The order-settlement pipeline
//!   - `config`: Environment-driven configuration
//!
//! # Delivery semantics
//!
//! The order publisher is at-least-once over the bus; trade-result
//! application is idempotent per order id. Together the pipeline is
//! exactly-once in effect.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and pipeline components.
pub mod infrastructure;

// =============================================================================
// Re-exports from Clean Architecture
// =============================================================================

// Domain re-exports
pub use domain::portfolio::value_objects::{
    Holding, LifecycleState, LoyaltyLevel, Order, OrderConditions, OrderDetails, OrderResult,
    OrderStatus, OrderType, Trade, ValuedHolding,
};
pub use domain::portfolio::{Portfolio, PortfolioError, PortfolioEvent};
pub use domain::shared::{Money, OrderId, PortfolioId, ShareCount, Symbol, Timestamp};

// Application re-exports
pub use application::ports::{
    BusError, CheckpointStorePort, EventStoreError, EventStorePort, NoOpOrderBus, OrderBusPort,
    Quote, QuoteError, QuoteProviderPort, RecordedEvent, TradeResultDelivery,
    TradeResultSourcePort,
};
pub use application::services::{
    PortfolioService, PortfolioValuation, PortfolioView, ServiceError, ValuationError,
    ValuationService,
};
pub use application::use_cases::{get_valued_portfolio, ValuedPortfolio, ValuedPortfolioError};

// Infrastructure re-exports
pub use infrastructure::bus::{InMemoryOrderBus, InMemoryTradeResultQueue};
pub use infrastructure::config::{EngineConfig, PublisherConfig};
pub use infrastructure::persistence::{InMemoryCheckpointStore, InMemoryEventStore};
pub use infrastructure::publisher::OrderPublisher;
pub use infrastructure::quotes::StaticQuoteProvider;
pub use infrastructure::reconciler::TradeResultReconciler;
