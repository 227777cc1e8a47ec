//! Logging setup
//!
//! Console output is pretty or JSON depending on `FOLDERBOT_LOG_FORMAT`.
//! When `FOLDERBOT_LOG_DIR` is set, the same events also go to a daily
//! rolling `folderbot.log` in that directory.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "warn,folderbot=info";
const LOG_FILE_NAME: &str = "folderbot.log";

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the lifetime of the process.
pub fn init_logging(log_format: &str, log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let (file_writer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    match log_format {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .with(file_writer.map(|w| fmt::layer().json().with_writer(w).with_ansi(false)))
                .try_init()?;
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .with(file_writer.map(|w| fmt::layer().with_writer(w).with_ansi(false)))
                .try_init()?;
        }
    }

    Ok(guard)
}
