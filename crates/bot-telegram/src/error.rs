//! Error types for the Telegram front-end.

use thiserror::Error;

/// Errors produced by the Telegram bot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Telegram API error.
    #[error("telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Application error bubbling up from a use case.
    #[error("application error: {0}")]
    App(#[from] folderbot_core::AppError),
}

/// Convenience alias.
pub type BotResult<T> = Result<T, BotError>;
