//! Notifier adapter delivering notices as Telegram chat messages.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::debug;

use folderbot_core::domain::{Notice, RequesterId};
use folderbot_core::port::{Notifier, NotifyError};

use crate::format::format_notice;

/// Sends each notice to the chat whose id is the requester id.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, requester: RequesterId, notice: Notice) -> Result<(), NotifyError> {
        let text = format_notice(&notice);
        self.bot
            .send_message(ChatId(requester.0), text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;

        debug!(chat_id = requester.0, failure = notice.is_failure(), "Notice delivered");
        Ok(())
    }
}
