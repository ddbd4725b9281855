//! Telegram Bot API: webhook update payloads, sendMessage, and webhook registration.

use crate::channels::notifier::Notifier;
use crate::config::BotToken;
use crate::error::WebhookError;
use async_trait::async_trait;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Formatting mode sent with every reply.
pub const PARSE_MODE: &str = "Markdown";

/// Telegram update payload (webhook POST body). Only the fields the bot reads.
#[derive(Debug, Default, Deserialize)]
pub struct TelegramUpdate {
    #[serde(default)]
    pub update_id: Option<i64>,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TelegramMessage {
    #[serde(default)]
    pub chat: Option<TelegramChat>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TelegramChat {
    #[serde(default)]
    pub id: Option<ChatId>,
}

impl TelegramMessage {
    /// Chat id when present and non-empty.
    pub fn chat_id(&self) -> Option<&ChatId> {
        self.chat
            .as_ref()
            .and_then(|c| c.id.as_ref())
            .filter(|id| !id.is_empty())
    }
}

/// Chat identifier: numeric id or `@channelusername`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    /// Numeric id above `i64::MAX`.
    Unsigned(u64),
    Username(String),
}

/// Integral floats (`42.0`) are accepted as numeric ids; fractional ones are rejected.
impl<'de> Deserialize<'de> for ChatId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Signed(i64),
            Unsigned(u64),
            Float(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Signed(n) => Ok(ChatId::Id(n)),
            Raw::Unsigned(n) => Ok(ChatId::Unsigned(n)),
            Raw::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(ChatId::Id(f as i64))
            }
            Raw::Float(f) => Err(de::Error::custom(format!(
                "chat id {} is not an integer",
                f
            ))),
            Raw::Text(s) => Ok(ChatId::Username(s)),
        }
    }
}

impl ChatId {
    pub fn is_empty(&self) -> bool {
        match self {
            ChatId::Id(_) | ChatId::Unsigned(_) => false,
            ChatId::Username(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{}", id),
            ChatId::Unsigned(id) => write!(f, "{}", id),
            ChatId::Username(s) => f.write_str(s),
        }
    }
}

/// sendMessage request body.
#[derive(Debug, Serialize)]
pub struct OutboundMessage<'a> {
    pub chat_id: &'a ChatId,
    pub text: &'a str,
    pub parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Bot API client. Holds the credential; cheap to clone.
#[derive(Clone)]
pub struct TelegramChannel {
    api_base: String,
    token: BotToken,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(api_base: impl Into<String>, token: BotToken) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token.expose(), method)
    }

    /// POST a Bot API method with a JSON body. Errors never carry the request URL (it embeds the token).
    async fn call<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> Result<(), String> {
        let res = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(format!("{} failed: {} {}", method, status, body));
        }
        let data: ApiResponse = res
            .json()
            .await
            .map_err(|e| e.without_url().to_string())?;
        if !data.ok {
            return Err(format!(
                "{} returned ok: false ({})",
                method,
                data.description.unwrap_or_default()
            ));
        }
        Ok(())
    }

    /// Send a text message to a chat via sendMessage. One attempt, no retry.
    pub async fn send_message(&self, chat_id: &ChatId, text: &str) -> Result<(), WebhookError> {
        if chat_id.is_empty() {
            return Err(WebhookError::DeliveryFailure("empty chat id".to_string()));
        }
        if text.is_empty() {
            return Err(WebhookError::DeliveryFailure("empty text".to_string()));
        }
        let body = OutboundMessage {
            chat_id,
            text,
            parse_mode: PARSE_MODE,
        };
        self.call("sendMessage", &body)
            .await
            .map_err(WebhookError::DeliveryFailure)
    }

    /// Set webhook URL (and optional secret). Telegram then POSTs updates to the URL.
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), String> {
        let mut body = serde_json::json!({ "url": url });
        if let Some(s) = secret {
            body["secret_token"] = serde_json::Value::String(s.to_string());
        }
        self.call("setWebhook", &body).await
    }

    /// Remove the webhook so Telegram stops POSTing updates.
    pub async fn delete_webhook(&self) -> Result<(), String> {
        self.call("deleteWebhook", &serde_json::json!({})).await
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    async fn send_message(&self, chat_id: &ChatId, text: &str) -> Result<(), WebhookError> {
        TelegramChannel::send_message(self, chat_id, text).await
    }
}
