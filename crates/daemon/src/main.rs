//! Folderbot - Main Entry Point
//! Telegram front-end + single upload worker

mod config;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use teloxide::prelude::*;
use tracing::{error, info, warn};

use folderbot_core::application::worker::constants::SHUTDOWN_GRACE_PERIOD;
use folderbot_core::application::history::DEFAULT_HISTORY_CAPACITY;
use folderbot_core::application::{
    shutdown_channel, CleanupService, EnqueueService, HealthService, UploadHistory, UploadQueue,
    Worker,
};
use folderbot_core::port::id_provider::UuidProvider;
use folderbot_core::port::time_provider::SystemTimeProvider;
use folderbot_core::port::{FolderCatalog, Uploader};
use folderbot_infra_system::{LocalFolderCatalog, SubprocessUploader, SystemProbeImpl};
use folderbot_telegram::{AccessPolicy, BotState, TelegramNotifier};

use crate::config::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BOT_STOP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "folderbot")]
#[command(about = "Telegram bot that queues local folders for upload", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory whose subfolders can be uploaded (overrides FOLDERBOT_LIBRARY_ROOT)
    #[arg(short, long)]
    library_root: Option<String>,

    /// Uploader program (overrides FOLDERBOT_UPLOADER)
    #[arg(short, long)]
    uploader: Option<String>,

    /// Read environment from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Environment and configuration
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let mut config = DaemonConfig::from_env()?;
    if let Some(root) = cli.library_root {
        config.library_root = shellexpand::tilde(&root).into_owned();
    }
    if let Some(program) = cli.uploader {
        config.uploader.program = program;
    }

    // 2. Logging
    let _log_guard = telemetry::init_logging(&config.log_format, config.log_dir.as_deref())?;

    info!("Folderbot v{} starting...", VERSION);
    info!(
        library_root = %config.library_root,
        uploader = %config.uploader.program,
        allowed_users = config.allowed_users.len(),
        "Configuration loaded"
    );

    // 3. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let queue = Arc::new(UploadQueue::new(id_provider, time_provider.clone()));
    let history = Arc::new(UploadHistory::new(
        time_provider.clone(),
        DEFAULT_HISTORY_CAPACITY,
    ));

    let catalog: Arc<dyn FolderCatalog> = Arc::new(LocalFolderCatalog::new(&config.library_root));
    if let Err(e) = catalog.check_writable().await {
        warn!(error = %e, "Library root is not usable yet");
    }

    let uploader: Arc<dyn Uploader> = Arc::new(SubprocessUploader::new(
        time_provider.clone(),
        config.uploader.clone(),
    ));
    match uploader.locate_program() {
        Some(path) => info!(program = %path.display(), "Uploader found"),
        None => warn!(program = %config.uploader.program, "Uploader not found on PATH; uploads will fail"),
    }

    let bot = Bot::new(&config.telegram_token);
    let bot_username = match bot.get_me().await {
        Ok(me) => me.user.username.clone().unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Could not fetch bot profile; accepting commands addressed to any bot");
            String::new()
        }
    };
    info!(username = %bot_username, "Telegram bot identified");
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));

    let worker = Worker::new(
        queue.clone(),
        catalog.clone(),
        uploader.clone(),
        notifier.clone(),
    )
    .with_history(history.clone())
    .with_poll_interval(config.poll_interval);
    let worker_status = worker.status();

    let health = HealthService::new(
        queue.clone(),
        catalog.clone(),
        uploader,
        Arc::new(SystemProbeImpl::new(config.library_root.clone())),
        worker_status.clone(),
    );

    let cleanup = CleanupService::new(
        queue.clone(),
        catalog.clone(),
        worker_status.clone(),
        history.clone(),
    );

    let state = BotState {
        enqueue: Arc::new(EnqueueService::new(queue.clone(), catalog.clone(), notifier)),
        queue,
        catalog,
        worker: worker_status,
        history,
        cleanup: Arc::new(cleanup),
        health: Arc::new(health),
        access: Arc::new(AccessPolicy::new(config.allowed_users.iter().copied())),
        bot_username: Arc::from(bot_username),
    };

    // 4. Start worker and bot
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    info!("Starting upload worker...");
    let worker_shutdown = shutdown_rx.clone();
    let mut worker_handle = tokio::spawn(async move {
        worker.run(worker_shutdown).await;
    });

    let mut bot_handle = tokio::spawn(folderbot_telegram::run(bot, state, shutdown_rx));

    info!("System ready. Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal (or an unexpected exit)
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Shutdown signal received. Exiting gracefully...");
        }
        res = &mut worker_handle => {
            error!(result = ?res, "Upload worker exited unexpectedly");
        }
        res = &mut bot_handle => {
            error!(result = ?res, "Telegram bot exited unexpectedly");
        }
    }

    // 6. Graceful shutdown; an upload in flight gets the grace period
    shutdown_tx.shutdown();

    if !bot_handle.is_finished()
        && tokio::time::timeout(BOT_STOP_TIMEOUT, &mut bot_handle).await.is_err()
    {
        warn!("Telegram bot did not stop in time");
        bot_handle.abort();
    }

    if !worker_handle.is_finished() {
        info!(
            grace_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
            "Waiting for the current upload to finish"
        );
        if tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, &mut worker_handle)
            .await
            .is_err()
        {
            warn!("Upload still running after grace period; abandoning it");
            worker_handle.abort();
        }
    }

    info!("Shutdown complete.");
    Ok(())
}
