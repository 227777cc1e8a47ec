//! Daemon configuration loaded from environment

use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use folderbot_infra_system::subprocess_uploader::FOLDER_PLACEHOLDER;
use folderbot_infra_system::UploaderConfig;

const DEFAULT_LIBRARY_ROOT: &str = "~/uploads";
const DEFAULT_LOG_FORMAT: &str = "pretty";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Everything the composition root needs, read once at startup
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Telegram bot token
    pub telegram_token: String,
    /// Directory whose subfolders can be uploaded (tilde-expanded)
    pub library_root: String,
    pub uploader: UploaderConfig,
    /// Fallback wake-up interval for the worker
    pub poll_interval: Duration,
    /// Telegram user ids allowed to use the bot; empty allows everyone
    pub allowed_users: Vec<u64>,
    /// `pretty` or `json`
    pub log_format: String,
    /// Directory for the daily rolling log file, if any
    pub log_dir: Option<String>,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram_token = var("TELOXIDE_TOKEN")
            .or_else(|| var("FOLDERBOT_TELEGRAM_TOKEN"))
            .context("TELOXIDE_TOKEN or FOLDERBOT_TELEGRAM_TOKEN environment variable is required")?;

        let library_root = shellexpand::tilde(
            &var("FOLDERBOT_LIBRARY_ROOT").unwrap_or_else(|| DEFAULT_LIBRARY_ROOT.to_string()),
        )
        .into_owned();

        let mut uploader = UploaderConfig::default();
        if let Some(program) = var("FOLDERBOT_UPLOADER") {
            uploader.program = program.trim().to_string();
        }
        if let Some(args) = var("FOLDERBOT_UPLOADER_ARGS") {
            uploader.args = args.split_whitespace().map(str::to_string).collect();
            if !uploader.args.iter().any(|a| a.contains(FOLDER_PLACEHOLDER)) {
                return Err(anyhow!(
                    "FOLDERBOT_UPLOADER_ARGS must contain {} where the folder path goes",
                    FOLDER_PLACEHOLDER
                ));
            }
        }
        if let Some(markers) = var("FOLDERBOT_SUCCESS_MARKERS") {
            uploader.success_markers = split_list(&markers, '|');
            if uploader.success_markers.is_empty() {
                return Err(anyhow!("FOLDERBOT_SUCCESS_MARKERS must name at least one marker"));
            }
        }
        if let Some(secs) = var("FOLDERBOT_UPLOAD_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .context("FOLDERBOT_UPLOAD_TIMEOUT_SECS must be a whole number of seconds")?;
            uploader.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(allowlist) = var("FOLDERBOT_ENV_ALLOWLIST") {
            uploader.env_allowlist = split_list(&allowlist, ',');
        }

        let poll_interval_ms: u64 = match var("FOLDERBOT_POLL_INTERVAL_MS") {
            Some(ms) => ms
                .trim()
                .parse()
                .context("FOLDERBOT_POLL_INTERVAL_MS must be a number of milliseconds")?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };
        if poll_interval_ms == 0 {
            return Err(anyhow!("FOLDERBOT_POLL_INTERVAL_MS must be greater than zero"));
        }

        let allowed_users = match var("FOLDERBOT_ALLOWED_USERS") {
            Some(users) => split_list(&users, ',')
                .iter()
                .map(|id| {
                    id.parse::<u64>()
                        .with_context(|| format!("invalid user id in FOLDERBOT_ALLOWED_USERS: {}", id))
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let log_format = var("FOLDERBOT_LOG_FORMAT")
            .map(|f| f.trim().to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_LOG_FORMAT.to_string());

        let log_dir = var("FOLDERBOT_LOG_DIR").map(|d| shellexpand::tilde(d.trim()).into_owned());

        Ok(Self {
            telegram_token,
            library_root,
            uploader,
            poll_interval: Duration::from_millis(poll_interval_ms),
            allowed_users,
            log_format,
            log_dir,
        })
    }
}

fn split_list(raw: &str, sep: char) -> Vec<String> {
    raw.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
