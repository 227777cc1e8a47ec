//! Command parsing for inbound chat messages.

/// A recognised bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    ListFolders,
    Status,
    /// Folder names to queue (may be empty; the use case rejects that).
    Download(Vec<String>),
    Cleanup,
    Debug,
    Unknown(String),
}

/// Whether `text` looks like a bot command, addressed to us or not.
pub fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

/// Parse a message into a command.
///
/// Returns `None` for plain text and for commands addressed to another bot
/// (`/status@other_bot`). `bot_username` is compared case-insensitively; an
/// empty one accepts any suffix. Folder arguments are split on whitespace;
/// double quotes group a name containing spaces.
pub fn parse_command(text: &str, bot_username: &str) -> Option<Command> {
    let text = text.trim_start();
    let rest = text.strip_prefix('/')?;

    let (head, args) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    let (name, target) = match head.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (head, None),
    };
    if let Some(target) = target {
        if !bot_username.is_empty() && !target.eq_ignore_ascii_case(bot_username) {
            return None;
        }
    }

    let cmd = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "listfolders" | "folders" => Command::ListFolders,
        "status" => Command::Status,
        "download" | "upload" => Command::Download(split_args(args)),
        "cleanup" => Command::Cleanup,
        "debug" => Command::Debug,
        _ => Command::Unknown(name.to_string()),
    };
    Some(cmd)
}

/// Split arguments on whitespace, keeping double-quoted groups together.
fn split_args(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in args.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    out.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        out.push(current);
    }
    out.retain(|a| !a.is_empty());
    out
}
