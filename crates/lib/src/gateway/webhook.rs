//! Webhook handler: parse the update, pick a reply, send it.

use crate::channels::{Notifier, TelegramUpdate};
use crate::classify::{classify, Classification};
use crate::error::WebhookError;
use crate::gateway::server::GatewayState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;

/// Header Telegram sets when the webhook was registered with a secret.
pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

type PlainResponse = (StatusCode, &'static str);

const OK: PlainResponse = (StatusCode::OK, "OK");
const FAILED: PlainResponse = (StatusCode::INTERNAL_SERVER_ERROR, "Error");

/// Handle one raw update body.
///
/// Returns `Ok(None)` when the update has no `message` (nothing to answer), otherwise the
/// chosen reply. The reply is sent only when the message carries a chat id. A failed send
/// is logged and does not make the update fail.
pub async fn handle_update(
    notifier: &dyn Notifier,
    body: &[u8],
) -> Result<Option<Classification>, WebhookError> {
    let update: TelegramUpdate = serde_json::from_slice(body)?;
    let Some(msg) = update.message else {
        log::debug!("update {:?} has no message, ignoring", update.update_id);
        return Ok(None);
    };
    let result = classify(msg.text.as_deref());
    let Some(chat_id) = msg.chat_id() else {
        log::debug!("message without chat id matched {}, not replying", result.rule.as_str());
        return Ok(Some(result));
    };
    log::debug!("chat {}: matched {}", chat_id, result.rule.as_str());
    if let Err(e) = notifier.send_message(chat_id, &result.reply).await {
        log::warn!("reply to chat {} not delivered: {}", chat_id, e);
    }
    Ok(Some(result))
}

/// Compares every byte regardless of where the first mismatch is. Length is not hidden.
fn secret_matches(provided: &[u8], expected: &[u8]) -> bool {
    provided.len() == expected.len()
        && provided
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// POST /api/telegram: always answers synchronously: `200 OK`, or `500 Error` without detail.
pub(crate) async fn telegram_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> PlainResponse {
    if let Some(ref expected) = state.webhook_secret {
        let provided = headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !secret_matches(provided.as_bytes(), expected.as_bytes()) {
            log::warn!("webhook request rejected: secret token mismatch");
            return (StatusCode::FORBIDDEN, "Forbidden");
        }
    }
    let outcome = AssertUnwindSafe(handle_update(state.notifier.as_ref(), &body))
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(_)) => OK,
        Ok(Err(e)) => {
            log::error!("webhook update failed: {}", e);
            FAILED
        }
        Err(_) => {
            log::error!("webhook handler panicked");
            FAILED
        }
    }
}
