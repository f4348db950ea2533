//! XRP Chat - conversational payments on the XRP Ledger
//!
//! A Rust backend that turns chat messages into confirmed, signed and
//! settled XRP payments.

mod api;
mod config;
mod history;
mod intent;
mod ledger;
mod reconciler;
mod router;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::AppConfig;
use ledger::{LedgerClient, LoggingLedgerClient, RpcSigner, XrplClient};
use state_machine::SessionContext;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xrp_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;
    tracing::info!(config = ?config, "Loaded configuration");

    // Ledger client and signer
    let xrpl = Arc::new(XrplClient::new(config.ledger.clone())?);
    let signer = Arc::new(RpcSigner::new(xrpl.clone(), config.seed.clone()));
    if config.seed.is_none() {
        tracing::warn!("XRP_CHAT_SEED not set; transfers can be proposed but not signed");
    }
    let ledger = Arc::new(LoggingLedgerClient::new(xrpl));

    // A failed initial connect is not fatal; the UI can retry
    if let Err(e) = ledger.connect().await {
        tracing::warn!(error = %e, rpc_url = %config.ledger.rpc_url, "Initial ledger connect failed");
    }

    let context = SessionContext::new(config.account.clone(), config.history_limit);
    let session = runtime::spawn_session(context, ledger, signer);
    if session.is_connected() {
        if let Err(e) = session.refresh_balance().await {
            tracing::warn!(error = %e, "Initial balance refresh failed");
        }
    }

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(session))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("XRP Chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
