//! Communication channels (Telegram).
//!
//! The gateway hands each reply to a [`Notifier`]; [`TelegramChannel`] is the Bot API
//! implementation and also manages webhook registration.

mod notifier;
mod telegram;

pub use notifier::Notifier;
pub use telegram::{
    ChatId, OutboundMessage, TelegramChannel, TelegramChat, TelegramMessage, TelegramUpdate,
    PARSE_MODE,
};
