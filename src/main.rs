// =============================================================================
// Smart Money Flow: Main Entry Point
// =============================================================================
//
// Loads the runtime config, wires the Yahoo daily-bar source into the flow
// engine and serves the HTTP API until Ctrl-C.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod engine;
mod error;
mod indicators;
mod market_data;
mod report;
mod runtime_config;
mod sentiment;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::engine::FlowEngine;
use crate::market_data::YahooClient;
use crate::runtime_config::RuntimeConfig;

const DEFAULT_CONFIG_PATH: &str = "smart_money_flow.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Smart Money Flow starting up");

    let config_path =
        std::env::var("SMF_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(path = %config_path, error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate().context("invalid runtime configuration")?;

    info!(
        instruments = ?config.instruments.keys().collect::<Vec<_>>(),
        lookback_days = config.lookback_days,
        "Configured instruments"
    );

    // ── 2. Engine & shared state ─────────────────────────────────────────
    let source = YahooClient::new(&config.data_source)?;
    let bind_addr = config.bind_addr.clone();
    let engine = FlowEngine::new(config, Arc::new(source));

    let api_token = std::env::var("SMF_API_TOKEN").ok();
    if api_token.as_deref().map_or(true, str::is_empty) {
        warn!("SMF_API_TOKEN not set, data endpoints are unauthenticated");
    }
    let state = Arc::new(AppState::new(engine, api_token));

    // ── 3. HTTP server ───────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Smart Money Flow shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
