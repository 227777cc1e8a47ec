//! Telegram HTML rendering of notices, status and reports.

use std::fmt::Write as _;

use folderbot_core::application::{CleanupReport, Enqueued, HealthReport, WorkerState};
use folderbot_core::domain::{CompletedUpload, Notice, QueueEntry};

/// Longest reply sent as one message (Telegram caps messages at 4096).
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Budget for the escaped uploader output attached to a notice.
pub const MAX_OUTPUT_LEN: usize = 3000;

/// Entries shown per listing before the rest is summarised.
pub const MAX_LISTED: usize = 50;

pub const HELP_TEXT: &str = "<b>Folder Upload Bot</b>\n\n\
    Queue local folders for upload to remote storage.\n\n\
    <b>Commands:</b>\n\
    /start, /help - This help text\n\
    /listfolders - Folders available for upload\n\
    /status - Current upload, queued folders and your recent uploads\n\
    /download &lt;folder&gt; [folder...] - Queue folders for upload\n\
    /cleanup - Remove empty folders and forget old uploads\n\
    /debug - Uploader and host diagnostics\n\n\
    Quote names containing spaces: /download \"summer trip\"";

pub const DOWNLOAD_USAGE: &str =
    "Usage: /download &lt;folder&gt; [folder...]\nSee /listfolders for available folders.";

/// Escape text for safe inclusion in Telegram HTML.
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escaped_len(c: char) -> usize {
    match c {
        '&' => 5,
        '<' | '>' => 4,
        '"' => 6,
        c => c.len_utf8(),
    }
}

/// Escaped tail of `output` that fits in `max_len` bytes, prefixed with `…`
/// when something was cut (the end of an uploader log is where the verdict is).
pub fn escaped_tail(output: &str, max_len: usize) -> String {
    let trimmed = output.trim();
    let mut budget = max_len;
    let mut start = trimmed.len();
    for (idx, c) in trimmed.char_indices().rev() {
        let cost = escaped_len(c);
        if cost > budget {
            break;
        }
        budget -= cost;
        start = idx;
    }

    let tail = html_escape(&trimmed[start..]);
    if start > 0 {
        format!("…{}", tail)
    } else {
        tail
    }
}

fn output_block(output: &str) -> String {
    if output.trim().is_empty() {
        "(no output)".to_string()
    } else {
        format!("<pre>{}</pre>", escaped_tail(output, MAX_OUTPUT_LEN))
    }
}

fn more_line(msg: &mut String, total: usize) {
    if total > MAX_LISTED {
        let _ = write!(msg, "\n…and {} more", total - MAX_LISTED);
    }
}

/// Split a reply into messages of at most `max_len` bytes.
///
/// Cuts at blank lines first, then line breaks, then anywhere on a char
/// boundary. Replies are built one self-contained line per item, so line
/// cuts never split an HTML tag.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    let max_len = if max_len == 0 { MAX_MESSAGE_LEN } else { max_len };
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let hard_cut = floor_char_boundary(remaining, max_len);
        let mut split_at = find_split_point(remaining, hard_cut, "\n\n")
            .or_else(|| find_split_point(remaining, hard_cut, "\n"))
            .unwrap_or(hard_cut);
        if split_at == 0 {
            split_at = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
        }

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk.trim_end_matches('\n').to_string());
        remaining = rest.trim_start_matches('\n');
    }
    chunks
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Position just past the last `delimiter` before `boundary`.
fn find_split_point(text: &str, boundary: usize, delimiter: &str) -> Option<usize> {
    text[..boundary]
        .rfind(delimiter)
        .map(|pos| pos + delimiter.len())
}

fn entry_label(entry: &QueueEntry) -> String {
    format!("#{} <code>{}</code>", entry.ticket, html_escape(entry.folder.as_str()))
}

pub fn format_notice(notice: &Notice) -> String {
    match notice {
        Notice::FolderNotFound { folder } => format!(
            "❌ Folder <code>{}</code> not found. See /listfolders.",
            html_escape(folder)
        ),
        Notice::InvalidFolder { folder, reason } => format!(
            "❌ Folder <code>{}</code> rejected: {}",
            html_escape(folder),
            html_escape(reason)
        ),
        Notice::UploadSucceeded { entry, output } => format!(
            "✅ Upload finished: {}\n{}",
            entry_label(entry),
            output_block(output)
        ),
        Notice::UploadFailed { entry, output } => format!(
            "❌ Upload failed: {}\n{}",
            entry_label(entry),
            output_block(output)
        ),
    }
}

pub fn format_enqueued(accepted: &[Enqueued]) -> String {
    let mut msg = String::from("📥 Queued for upload:");
    for item in accepted.iter().take(MAX_LISTED) {
        let _ = write!(
            msg,
            "\n{} (position {})",
            entry_label(&item.entry),
            item.position
        );
    }
    more_line(&mut msg, accepted.len());
    msg
}

pub fn format_status(
    pending: &[QueueEntry],
    worker: &WorkerState,
    recent: &[CompletedUpload],
    tickets_issued: u64,
) -> String {
    let mut msg = String::from("<b>Upload status</b>\n");

    match worker {
        WorkerState::Processing(entry) => {
            let _ = write!(msg, "Uploading: {}\n", entry_label(entry));
        }
        WorkerState::Idle => msg.push_str("Uploading: nothing\n"),
    }

    if pending.is_empty() {
        msg.push_str("Queue: empty");
    } else {
        let _ = write!(msg, "Queue ({}):", pending.len());
        for (i, entry) in pending.iter().take(MAX_LISTED).enumerate() {
            let _ = write!(msg, "\n{}. {}", i + 1, entry_label(entry));
        }
        more_line(&mut msg, pending.len());
    }

    if !recent.is_empty() {
        msg.push_str("\n\n<b>Your recent uploads</b>");
        for done in recent {
            let _ = write!(
                msg,
                "\n{} {}",
                if done.succeeded { "✅" } else { "❌" },
                entry_label(&done.entry)
            );
        }
    }

    let _ = write!(msg, "\nJobs received: {}", tickets_issued);
    msg
}

pub fn format_folders(folders: &[String]) -> String {
    if folders.is_empty() {
        return "No folders available.".to_string();
    }
    let mut msg = format!("<b>Folders ({})</b>", folders.len());
    for folder in folders.iter().take(MAX_LISTED) {
        let _ = write!(msg, "\n• <code>{}</code>", html_escape(folder));
    }
    more_line(&mut msg, folders.len());
    msg
}

pub fn format_cleanup(report: &CleanupReport) -> String {
    let mut msg = format!(
        "🧹 Cleanup done\nEmpty folders removed: {}\nOld uploads forgotten: {}",
        report.removed_dirs.len(),
        report.pruned_records
    );
    for dir in report.removed_dirs.iter().take(MAX_LISTED) {
        let _ = write!(msg, "\n• <code>{}</code>", html_escape(dir));
    }
    more_line(&mut msg, report.removed_dirs.len());
    msg
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "✅"
    } else {
        "❌"
    }
}

pub fn format_health(report: &HealthReport) -> String {
    let mut msg = format!("<b>Diagnostics</b> (v{})\n", html_escape(&report.version));

    match &report.uploader_program {
        Some(path) => {
            let _ = write!(msg, "Uploader: ✅ <code>{}</code>\n", html_escape(path));
        }
        None => msg.push_str("Uploader: ❌ not found\n"),
    }

    let _ = write!(
        msg,
        "Library: <code>{}</code>\nWritable: {}\n",
        html_escape(&report.library_root),
        yes_no(report.library_writable)
    );
    if let Some(err) = &report.library_error {
        let _ = write!(msg, "Error: {}\n", html_escape(err));
    }
    if let Some(count) = report.folders_available {
        let _ = write!(msg, "Folders: {}\n", count);
    }

    let _ = write!(
        msg,
        "Queue: {} pending, {} received\nUploading: {}\n",
        report.queue_length,
        report.tickets_issued,
        report
            .uploading
            .as_deref()
            .map(html_escape)
            .unwrap_or_else(|| "nothing".to_string())
    );

    let sys = &report.system;
    let _ = write!(
        msg,
        "CPU: {:.1}%\nMemory: {} / {} MB\nDisk free: {} / {} GB",
        sys.cpu_usage_percent,
        sys.memory_used_mb,
        sys.memory_total_mb,
        sys.disk_available_gb,
        sys.disk_total_gb
    );
    msg
}
