//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (path given on the command line) and environment.
//! The only environment override is `TELEGRAM_BOT_TOKEN`; everything else lives in the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::TokenError;

/// Default Telegram Bot API base URL.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Environment variable holding the bot credential.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Top-level application config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Server bind and port.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the webhook endpoint (default 8787).
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_port() -> u16 {
    8787
}

fn default_server_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

/// Telegram bot config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// Bot API base URL. Defaults to https://api.telegram.org.
    pub api_base: Option<String>,
    /// Public URL registered with setWebhook when the server starts.
    pub webhook_url: Option<String>,
    /// Optional secret checked against X-Telegram-Bot-Api-Secret-Token on inbound POSTs.
    pub webhook_secret: Option<String>,
}

/// Bot credential. Validated on construction; never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct BotToken(String);

impl BotToken {
    /// Accepts tokens shaped like `123456:ABC-def_ghi` (numeric bot id, colon, secret).
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let t = raw.trim();
        if t.is_empty() {
            return Err(TokenError::Missing);
        }
        let (id, secret) = t.split_once(':').ok_or(TokenError::Malformed)?;
        let id_ok = !id.is_empty() && id.chars().all(|c| c.is_ascii_digit());
        let secret_ok = !secret.is_empty()
            && secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !id_ok || !secret_ok {
            return Err(TokenError::Malformed);
        }
        Ok(Self(t.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotToken(***)")
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Result<BotToken, TokenError> {
    let env = std::env::var(TELEGRAM_TOKEN_ENV).ok();
    resolve_token_from(env.as_deref(), config)
}

fn resolve_token_from(env: Option<&str>, config: &Config) -> Result<BotToken, TokenError> {
    let raw = non_empty(env)
        .or_else(|| non_empty(config.telegram.bot_token.as_deref()))
        .ok_or(TokenError::Missing)?;
    BotToken::parse(&raw)
}

/// Bot API base URL without a trailing slash.
pub fn resolve_api_base(config: &Config) -> String {
    non_empty(config.telegram.api_base.as_deref())
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string())
}

/// Webhook secret, if one is configured and non-empty.
pub fn resolve_webhook_secret(config: &Config) -> Option<String> {
    non_empty(config.telegram.webhook_secret.as_deref())
}

/// Default config path: `psyche.json` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("psyche.json")
}

/// Load config from `path` (or the default path). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        read_config(&path)?
    };
    Ok((config, path))
}

fn read_config(path: &Path) -> Result<Config> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parsing config from {}", path.display()))
}
