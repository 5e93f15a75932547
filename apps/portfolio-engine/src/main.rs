//! Portfolio Engine Binary
//!
//! Starts the portfolio engine with in-memory adapters and a simulated
//! settlement venue, runs a small demonstration flow, then serves until
//! interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin portfolio-engine
//! ```
//!
//! # Environment Variables
//!
//! - `QUOTE_TIMEOUT_MS`: Per-quote valuation deadline (default: 1000)
//! - `PUBLISHER_BATCH_SIZE`: Events per publisher poll (default: 100)
//! - `PUBLISHER_POLL_INTERVAL_MS`: Publisher idle poll interval (default: 250)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use portfolio_engine::application::use_cases::get_valued_portfolio;
use portfolio_engine::{
    EngineConfig, InMemoryCheckpointStore, InMemoryEventStore, InMemoryOrderBus,
    InMemoryTradeResultQueue, Money, Order, OrderDetails, OrderPublisher, OrderResult, OrderType,
    PortfolioService, QuoteProviderPort, ShareCount, StaticQuoteProvider, Symbol, Trade,
    TradeResultReconciler, ValuationService,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    tracing::info!("Starting portfolio engine");

    let config = EngineConfig::from_env();
    log_config(&config);

    let store = Arc::new(InMemoryEventStore::new());
    let checkpoints = Arc::new(InMemoryCheckpointStore::new());
    let (bus, placed_orders) = InMemoryOrderBus::with_channel();
    let bus = Arc::new(bus);
    let results = Arc::new(InMemoryTradeResultQueue::new());
    let quotes = Arc::new(StaticQuoteProvider::with_prices([
        (Symbol::new("IBM"), Money::from_cents(15212)),
        (Symbol::new("AAPL"), Money::from_cents(20034)),
        (Symbol::new("MSFT"), Money::from_cents(41180)),
    ]));

    let portfolios = Arc::new(PortfolioService::new(Arc::clone(&store)));
    let valuation = ValuationService::new(Arc::clone(&quotes), config.quote_timeout);

    let shutdown = CancellationToken::new();
    let publisher_handle = tokio::spawn(
        OrderPublisher::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&checkpoints),
            config.publisher.clone(),
            shutdown.clone(),
        )
        .run(),
    );
    let reconciler_handle = tokio::spawn(
        TradeResultReconciler::new(
            Arc::clone(&portfolios),
            Arc::clone(&results),
            shutdown.clone(),
        )
        .run(),
    );
    let venue_handle = tokio::spawn(run_simulated_venue(
        placed_orders,
        Arc::clone(&quotes),
        Arc::clone(&results),
        shutdown.clone(),
    ));

    if let Err(err) = run_demo(&portfolios, &valuation).await {
        tracing::warn!(error = %err, "demo flow failed");
    }

    tracing::info!("Portfolio engine ready");

    signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    shutdown.cancel();
    results.close().await;
    await_shutdown(publisher_handle, reconciler_handle, venue_handle).await;

    tracing::info!("Portfolio engine stopped");
    Ok(())
}

/// Initialize the tracing subscriber with environment filter.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "portfolio_engine=info"
                    .parse()
                    .expect("static directive 'portfolio_engine=info' is valid"),
            ),
        )
        .init();
}

/// Log the parsed configuration.
fn log_config(config: &EngineConfig) {
    tracing::info!(
        quote_timeout_ms = config.quote_timeout.as_millis() as u64,
        publisher_batch_size = config.publisher.batch_size,
        publisher_poll_interval_ms = config.publisher.poll_interval.as_millis() as u64,
        "Configuration loaded"
    );
}

/// Settlement venue stand-in: fulfills every published order at the current
/// quote, or fails it when no quote exists.
async fn run_simulated_venue(
    mut orders: mpsc::UnboundedReceiver<Order>,
    quotes: Arc<StaticQuoteProvider>,
    results: Arc<InMemoryTradeResultQueue>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            order = orders.recv() => {
                let Some(order) = order else { break };
                let result = match quotes.quote(order.symbol()).await {
                    Ok(quote) => OrderResult::Fulfilled {
                        order_id: order.order_id.clone(),
                        portfolio_id: order.portfolio_id.clone(),
                        trade: Trade {
                            order_id: order.order_id.clone(),
                            symbol: order.symbol().clone(),
                            share_count: order.share_count(),
                            order_type: order.order_type(),
                            price: quote.price,
                        },
                    },
                    Err(_) => OrderResult::Failed {
                        order_id: order.order_id.clone(),
                        portfolio_id: order.portfolio_id.clone(),
                    },
                };
                results.push(result).await;
            }
        }
    }
}

/// Open a portfolio, buy through the full pipeline, and log the valuation.
async fn run_demo(
    portfolios: &Arc<PortfolioService<InMemoryEventStore>>,
    valuation: &ValuationService<StaticQuoteProvider>,
) -> anyhow::Result<()> {
    let portfolio_id = portfolios.open_portfolio("demo").await?;
    portfolios
        .place_order(
            &portfolio_id,
            OrderDetails::market(Symbol::new("IBM"), ShareCount::new(31), OrderType::Buy),
        )
        .await?;

    // Wait for the buy to travel publisher -> venue -> reconciler.
    for _ in 0..100 {
        let view = portfolios.portfolio(&portfolio_id).await?;
        if !view.holdings.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let valued = get_valued_portfolio(portfolios, valuation, &portfolio_id).await?;
    tracing::info!(
        portfolio_id = %portfolio_id,
        funds = %valued.view.funds,
        total_value = %valued.total_value,
        loyalty_level = %valued.view.loyalty_level,
        "demo portfolio settled"
    );
    Ok(())
}

/// Wait for the pipeline tasks to finish, bounded by the shutdown timeout.
async fn await_shutdown(
    publisher: JoinHandle<()>,
    reconciler: JoinHandle<()>,
    venue: JoinHandle<()>,
) {
    let drain = async {
        for (name, handle) in [
            ("publisher", publisher),
            ("reconciler", reconciler),
            ("venue", venue),
        ] {
            if let Err(err) = handle.await {
                tracing::warn!(task = name, error = %err, "task ended abnormally");
            }
        }
    };
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
        tracing::warn!("shutdown timed out, aborting remaining tasks");
    }
}
