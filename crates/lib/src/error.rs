//! Error types for the webhook path and the bot credential.

/// Failures while handling one inbound update.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Body is not a JSON Telegram update.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    /// sendMessage did not go through (network error, non-success status, ok: false).
    #[error("delivery failed: {0}")]
    DeliveryFailure(String),
}

/// Bot credential problems found at startup.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("telegram bot token not configured (set TELEGRAM_BOT_TOKEN or telegram.botToken)")]
    Missing,
    #[error("telegram bot token is malformed (expected <bot id>:<secret>)")]
    Malformed,
}
