//! spendwise-gateway server entry point.
//!
//! Wires stores, capabilities and services, then starts the Axum server.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use spendwise_gateway::advisor::{Advisor, ChatModel, OpenAiChat};
use spendwise_gateway::app_state::AppState;
use spendwise_gateway::build_app;
use spendwise_gateway::config::{GatewayConfig, LogFormat};
use spendwise_gateway::persistence::{
    InMemoryStore, PostgresStore, RewardCatalog, RewardLedger, TransactionStore,
};
use spendwise_gateway::service::{InsightService, RewardService, TransactionService};

type Stores = (
    Arc<dyn TransactionStore>,
    Arc<dyn RewardCatalog>,
    Arc<dyn RewardLedger>,
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting spendwise-gateway");

    // Build persistence layer
    let (transactions, catalog, ledger): Stores = if config.persistence_enabled {
        let store = PostgresStore::connect(&config)
            .await
            .context("connecting to PostgreSQL")?;
        split(Arc::new(store))
    } else {
        tracing::warn!("persistence disabled, state is kept in memory");
        split(Arc::new(InMemoryStore::new()))
    };

    // Build capability layer
    let model: Option<Arc<dyn ChatModel>> = match OpenAiChat::from_config(&config.ai)? {
        Some(client) => {
            tracing::info!(model = %config.ai.model, "language model enabled");
            Some(Arc::new(client))
        }
        None => {
            tracing::info!("no OPENAI_API_KEY, using rule-based capabilities");
            None
        }
    };
    let advisor = Advisor::new(model, config.ai.max_batch);

    // Build service layer
    let rewards = Arc::new(RewardService::new(
        Arc::clone(&transactions),
        catalog,
        ledger,
    ));
    if config.seed_catalog {
        let added = rewards.seed_default_catalog().await?;
        tracing::info!(added, "reward catalog seeded");
    }
    let insights = Arc::new(InsightService::new(Arc::clone(&transactions), advisor));
    let transactions = Arc::new(TransactionService::new(transactions));

    // Build application state
    let app_state = AppState {
        rewards,
        insights,
        transactions,
    };

    // Build router
    let app = build_app(app_state, config.request_timeout);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn split<S>(store: Arc<S>) -> Stores
where
    S: TransactionStore + RewardCatalog + RewardLedger + 'static,
{
    let transactions: Arc<dyn TransactionStore> = Arc::<S>::clone(&store);
    let catalog: Arc<dyn RewardCatalog> = Arc::<S>::clone(&store);
    let ledger: Arc<dyn RewardLedger> = store;
    (transactions, catalog, ledger)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
