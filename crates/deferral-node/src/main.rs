//! # Deferral Node
//!
//! Hosts a request ledger behind an HTTP API and a notification WebSocket.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use deferral_core::{CallDispatcher, RequestLedger};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod dispatch;
mod state;

use config::NodeConfig;
use dispatch::HttpDispatcher;
use state::AppState;

/// Run the deferral node server.
pub async fn run_server(config: NodeConfig) -> anyhow::Result<()> {
    info!("🚀 Deferral node starting...");

    let dispatcher = match &config.targets {
        Some(path) => {
            let dispatcher = HttpDispatcher::from_file(path)?;
            info!(
                "Loaded {} directed-call targets from {}",
                dispatcher.target_count(),
                path.display()
            );
            dispatcher
        }
        None => {
            warn!("No target registry configured, every directed call will fail");
            HttpDispatcher::new(HashMap::new())
        }
    };
    let dispatcher: Arc<dyn CallDispatcher> = Arc::new(dispatcher);

    let ledger = RequestLedger::new(config.authority, dispatcher)?;
    info!("Trigger authority: {}", config.authority);

    let app = create_router(AppState::new(ledger));

    info!("🌐 Listening on http://{}", config.listen);

    let listener = TcpListener::bind(config.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Deferral node stopped");
    Ok(())
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))

        // Request API
        .route(
            "/api/v1/requests",
            post(api::request::submit_request).get(api::request::list_requests),
        )
        .route(
            "/api/v1/requests/:id",
            get(api::request::get_request).delete(api::request::cancel_request),
        )
        .route(
            "/api/v1/requests/:id/execute",
            post(api::request::execute_request),
        )

        // Authority API
        .route(
            "/api/v1/authority",
            get(api::authority::get_authority).put(api::authority::transfer_authority),
        )

        // Notifications
        .route("/ws/events", get(api::ws::event_stream))

        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
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

    let config = NodeConfig::parse();
    run_server(config).await
}


#[cfg(test)]
mod tests {
    use axum_test::TestServer;

    use super::*;

    #[tokio::test]
    async fn test_health() {
        let server = TestServer::new(create_router(testing::test_state(true))).unwrap();
        let response = server.get("/health").await;
        response.assert_status_ok();
        let health: serde_json::Value = response.json();
        assert_eq!(health["status"], "healthy");
    }
}
