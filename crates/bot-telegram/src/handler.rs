//! Message handler: parses chat commands and answers them from the queue,
//! catalog and diagnostics services.

use std::collections::HashSet;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{info, warn};

use folderbot_core::application::{
    CleanupService, EnqueueService, HealthService, UploadHistory, UploadQueue, WorkerStatus,
};
use folderbot_core::domain::RequesterId;
use folderbot_core::port::FolderCatalog;
use folderbot_core::AppError;

use crate::command::{is_command, parse_command, Command};
use crate::error::BotResult;
use crate::format;

/// Which Telegram users may talk to the bot. Empty means everyone.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    allowed_user_ids: HashSet<u64>,
}

impl AccessPolicy {
    pub fn new(allowed_user_ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            allowed_user_ids: allowed_user_ids.into_iter().collect(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.allowed_user_ids.is_empty()
    }

    pub fn is_user_allowed(&self, user_id: u64) -> bool {
        self.is_open() || self.allowed_user_ids.contains(&user_id)
    }
}

/// Completed uploads shown per requester in `/status`
pub const RECENT_IN_STATUS: usize = 3;

/// Shared bot state passed to all handlers.
#[derive(Clone)]
pub struct BotState {
    pub enqueue: Arc<EnqueueService>,
    pub queue: Arc<UploadQueue>,
    pub catalog: Arc<dyn FolderCatalog>,
    pub worker: WorkerStatus,
    pub history: Arc<UploadHistory>,
    pub cleanup: Arc<CleanupService>,
    pub health: Arc<HealthService>,
    pub access: Arc<AccessPolicy>,
    /// Our own username, without `@`; empty when unknown
    pub bot_username: Arc<str>,
}

/// Handle an incoming text message.
pub async fn handle_message(bot: Bot, msg: Message, state: BotState) -> BotResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;

    // Without a sender we cannot check the allowlist.
    let user_allowed = match &msg.from {
        Some(user) => state.access.is_user_allowed(user.id.0),
        None => state.access.is_open(),
    };
    if !user_allowed {
        warn!(chat_id = chat_id.0, "Rejected message from unauthorized user");
        bot.send_message(chat_id, "You are not authorized to use this bot.")
            .await?;
        return Ok(());
    }

    let reply = match parse_command(text, &state.bot_username) {
        Some(cmd) => respond(&state, RequesterId(chat_id.0), cmd).await?,
        // Addressed to another bot, or chatter in a group
        None if is_command(text) || !msg.chat.is_private() => return Ok(()),
        None => "Send /help to see the available commands.".to_string(),
    };

    for chunk in format::chunk_text(&reply, format::MAX_MESSAGE_LEN) {
        bot.send_message(chat_id, chunk)
            .parse_mode(ParseMode::Html)
            .await?;
    }
    Ok(())
}

/// Build the HTML reply for a command.
///
/// Folder rejections from `/download` are delivered through the notifier,
/// so the reply only lists accepted folders.
pub async fn respond(state: &BotState, requester: RequesterId, cmd: Command) -> BotResult<String> {
    let reply = match cmd {
        Command::Start | Command::Help => format::HELP_TEXT.to_string(),
        Command::ListFolders => match state.catalog.list().await {
            Ok(folders) => format::format_folders(&folders),
            Err(e) => {
                warn!(error = %e, "Folder listing failed");
                format!("Failed to list folders: {}", format::html_escape(&e.to_string()))
            }
        },
        Command::Status => {
            // Queue before worker: a claimed entry is published before it
            // leaves the queue, so it shows up in at least one of them.
            let pending = state.queue.peek_all();
            let current = state.worker.current();
            let recent = state.history.recent_for(requester, RECENT_IN_STATUS);
            format::format_status(&pending, &current, &recent, state.queue.total_enqueued())
        }
        Command::Download(folders) => match state.enqueue.request(requester, &folders).await {
            Ok(report) if report.accepted.is_empty() => {
                "Nothing was queued.".to_string()
            }
            Ok(report) => {
                info!(
                    requester = %requester,
                    accepted = report.accepted.len(),
                    rejected = report.rejected.len(),
                    "Download request handled"
                );
                format::format_enqueued(&report.accepted)
            }
            Err(AppError::Validation(_)) => format::DOWNLOAD_USAGE.to_string(),
            Err(e) => return Err(e.into()),
        },
        Command::Cleanup => match state.cleanup.run().await {
            Ok(report) => {
                info!(
                    requester = %requester,
                    removed_dirs = report.removed_dirs.len(),
                    pruned_records = report.pruned_records,
                    "Cleanup requested"
                );
                format::format_cleanup(&report)
            }
            Err(AppError::Catalog(e)) => {
                warn!(error = %e, "Cleanup failed");
                format!("Cleanup failed: {}", format::html_escape(&e.to_string()))
            }
            Err(e) => return Err(e.into()),
        },
        Command::Debug => format::format_health(&state.health.report().await),
        Command::Unknown(name) => format!(
            "Unknown command /{}. Try /help.",
            format::html_escape(&name)
        ),
    };
    Ok(reply)
}
