//! Gateway: HTTP server for Telegram webhook POSTs.
//!
//! `POST /api/telegram` classifies the update and replies through the notifier;
//! `GET /` is a health probe. The handler keeps no state between requests.

mod server;
mod webhook;

pub use server::{router, run_gateway, GatewayState, WEBHOOK_PATH};
pub use webhook::{handle_update, SECRET_HEADER};
