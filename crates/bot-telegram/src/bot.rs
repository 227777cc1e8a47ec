//! Teloxide dispatcher setup and lifecycle.

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use tracing::{info, warn};

use folderbot_core::application::ShutdownToken;

use crate::error::BotError;
use crate::handler::{self, BotState};

fn build_handler(state: BotState) -> UpdateHandler<BotError> {
    Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let state = state.clone();
        async move { handler::handle_message(bot, msg, state).await }
    })
}

/// Poll Telegram for updates until `shutdown` fires.
pub async fn run(bot: Bot, state: BotState, mut shutdown: ShutdownToken) {
    if state.access.is_open() {
        warn!("Telegram bot starting with NO user restrictions; set FOLDERBOT_ALLOWED_USERS to restrict access");
    }

    let mut dispatcher = Dispatcher::builder(bot, build_handler(state)).build();
    let token = dispatcher.shutdown_token();

    let watcher = tokio::spawn(async move {
        shutdown.wait().await;
        info!("Stopping Telegram dispatcher");
        match token.shutdown() {
            Ok(stopped) => stopped.await,
            Err(e) => warn!(error = ?e, "Dispatcher was not running at shutdown"),
        }
    });

    info!("Starting Telegram bot...");
    dispatcher.dispatch().await;
    watcher.abort();
    info!("Bot stopped");
}
