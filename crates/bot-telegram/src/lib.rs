// Folderbot Telegram Front-end
// Inbound commands and outbound notices over the Telegram Bot API

pub mod bot;
pub mod command;
pub mod error;
pub mod format;
pub mod handler;
pub mod notifier;

pub use bot::run;
pub use command::{parse_command, Command};
pub use error::{BotError, BotResult};
pub use handler::{AccessPolicy, BotState};
pub use notifier::TelegramNotifier;
