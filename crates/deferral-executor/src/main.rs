//! # Deferral Executor
//!
//! Watches a deferral node and executes requests as its trigger authority.

use std::sync::Arc;

use clap::Parser;
use deferral_executor::{
    ExecutorConfig, ExecutorService, HttpCostOracle, RequestTracker,
};
use deferral_sdk::DeferralClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

async fn run_executor(config: ExecutorConfig) -> anyhow::Result<()> {
    info!("🚀 Deferral executor starting...");

    let client = DeferralClient::connect(&config.node_url, config.identity).await?;
    let authority = client.trigger_authority().await?;
    if authority != config.identity {
        warn!(
            "Executor identity {} is not the trigger authority {}, executions will be refused",
            config.identity, authority
        );
    }

    let events = client.events().await?.into_stream();
    let tracker = RequestTracker::load(&config.state_file)?;
    let oracle = HttpCostOracle::new(config.cost_oracle_url.clone());

    info!("📡 Following {} as {}", config.node_url, config.identity);

    let service = ExecutorService::new(
        Arc::new(client),
        Arc::new(oracle),
        tracker,
        config.policy(),
        config.forecast_window,
    );
    service
        .run(events, config.poll_interval(), shutdown_signal())
        .await?;

    info!("Deferral executor stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ExecutorConfig::parse();
    run_executor(config).await
}
