//! Outbound notifier: delivers a reply to the chat an update came from.

use crate::channels::telegram::ChatId;
use crate::error::WebhookError;
use async_trait::async_trait;

/// Sends text to a chat. Implemented by the Telegram client; tests substitute a recorder.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to `chat_id`. One attempt; failures are reported, not retried.
    async fn send_message(&self, chat_id: &ChatId, text: &str) -> Result<(), WebhookError>;
}
