// =============================================================================
// QuoteDeck — Main Entry Point
// =============================================================================
//
// Serves the Alpha Vantage gateway over a small JSON API. Without an API key
// the server still starts; every data request then answers 404 and the
// gateway reports itself unconfigured.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod alpha_vantage;
mod api;
mod app_state;
mod market;
mod runtime_config;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::{RuntimeConfig, API_KEY_ENV, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║              QuoteDeck — Starting Up                     ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env(|name| std::env::var(name).ok());

    if !config.has_api_key() {
        error!(
            env = API_KEY_ENV,
            "No Alpha Vantage API key configured, all market data requests will be empty"
        );
    }
    info!(
        base_url = %config.base_url,
        default_interval = %config.default_interval,
        popular = ?config.popular_symbols,
        "Gateway configured"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState::new(&config, shutdown.clone())?);

    // ── 3. Start the API server ──────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "API server listening");

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Shutdown signal received, cancelling in-flight requests");
            signal.cancel();
        })
        .await
        .context("API server failed")?;

    info!("QuoteDeck shut down complete.");
    Ok(())
}
