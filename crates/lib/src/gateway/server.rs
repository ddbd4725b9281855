//! Gateway HTTP server: routes, startup, graceful shutdown.

use crate::channels::{Notifier, TelegramChannel};
use crate::config::{self, Config};
use crate::gateway::webhook::telegram_webhook;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Path Telegram POSTs updates to.
pub const WEBHOOK_PATH: &str = "/api/telegram";

/// Immutable per-process state, cloned into every request.
#[derive(Clone)]
pub struct GatewayState {
    /// Port reported by the health probe.
    pub port: u16,
    /// When Some, inbound POSTs must carry this value in X-Telegram-Bot-Api-Secret-Token.
    pub webhook_secret: Option<String>,
    pub notifier: Arc<dyn Notifier>,
}

/// Routes: `GET /` health, `POST /api/telegram` webhook.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route(WEBHOOK_PATH, post(telegram_webhook))
        .with_state(state)
}

/// Run the webhook server on config.server.bind:config.server.port.
/// Fails before binding when no valid bot token is configured.
/// When telegram.webhookUrl is set, registers it on startup and removes it on shutdown.
/// Blocks until shutdown (Ctrl+C or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    let token = config::resolve_telegram_token(&config)?;
    let telegram = Arc::new(TelegramChannel::new(config::resolve_api_base(&config), token));
    let webhook_secret = config::resolve_webhook_secret(&config);

    let registered = match config.telegram.webhook_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            match telegram.set_webhook(url, webhook_secret.as_deref()).await {
                Ok(()) => {
                    log::info!("telegram webhook registered: {}", url);
                    Some(telegram.clone())
                }
                Err(e) => {
                    log::warn!("telegram set_webhook failed: {}", e);
                    None
                }
            }
        }
        _ => None,
    };

    let state = GatewayState {
        port: config.server.port,
        webhook_secret,
        notifier: telegram,
    };

    let bind_addr = format!("{}:{}", config.server.bind.trim(), config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("webhook server listening on {}{}", bind_addr, WEBHOOK_PATH);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(registered))
        .await
        .context("webhook server exited")?;
    log::info!("webhook server stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Removes the Telegram webhook if this process registered it.
async fn shutdown_signal(registered: Option<Arc<TelegramChannel>>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");

    if let Some(t) = registered {
        if let Err(e) = t.delete_webhook().await {
            log::debug!("telegram delete_webhook on shutdown: {}", e);
        }
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}
