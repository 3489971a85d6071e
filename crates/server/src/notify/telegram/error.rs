//! Telegram errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Request(String),

    #[error("Telegram response error: {0}")]
    Response(String),

    /// The Bot API answered with `ok: false`.
    #[error("Telegram API error: {0}")]
    Api(String),

    /// Webhook secret header missing or wrong.
    #[error("Invalid Telegram webhook secret")]
    InvalidSecret,
}
