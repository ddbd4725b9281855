//! Psyche core library: Telegram webhook gateway, reply classifier, and Bot API client
//! used by the `psyche` CLI.

pub mod channels;
pub mod classify;
pub mod config;
pub mod error;
pub mod gateway;
