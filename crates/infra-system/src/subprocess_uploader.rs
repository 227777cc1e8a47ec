// Subprocess uploader implementation
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{info, warn};

use folderbot_core::application::worker::constants::GRACEFUL_KILL_TIMEOUT_MS;
use folderbot_core::port::uploader::{UploadError, UploadOutcome, UploadReport, Uploader};
use folderbot_core::port::TimeProvider;

/// Placeholder replaced by the absolute folder path in the argument template
pub const FOLDER_PLACEHOLDER: &str = "{folder}";

/// Substrings in the uploader output that mean the upload went through
pub const DEFAULT_SUCCESS_MARKERS: [&str; 2] = ["UPLOAD      : Done", "All files uploaded"];

/// How to run the external uploader
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub program: String,
    /// Argument template; every `{folder}` is replaced by the folder path
    pub args: Vec<String>,
    pub success_markers: Vec<String>,
    /// `None` waits forever, like the upload tool expects
    pub timeout: Option<Duration>,
    /// Environment variables passed through to the uploader
    pub env_allowlist: Vec<String>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            program: "terabox".to_string(),
            args: vec![
                "upload".to_string(),
                FOLDER_PLACEHOLDER.to_string(),
                "--recursive".to_string(),
            ],
            success_markers: DEFAULT_SUCCESS_MARKERS.iter().map(|m| m.to_string()).collect(),
            timeout: None,
            env_allowlist: vec!["PATH".to_string(), "HOME".to_string(), "USER".to_string()],
        }
    }
}

/// Decide the outcome from captured uploader output.
///
/// The tool only prints human-readable status lines, so this is the single
/// place where "did it work" is inferred: any configured marker means success.
pub fn interpret_output(output: &str, success_markers: &[String]) -> UploadOutcome {
    if success_markers
        .iter()
        .any(|marker| !marker.is_empty() && output.contains(marker.as_str()))
    {
        UploadOutcome::Success
    } else {
        UploadOutcome::Failure
    }
}

/// Subprocess uploader
/// Runs one uploader process per folder with an allowlisted environment
pub struct SubprocessUploader {
    time_provider: Arc<dyn TimeProvider>,
    config: UploaderConfig,
}

impl SubprocessUploader {
    /// Create a new subprocess uploader
    ///
    /// # Example
    /// ```ignore
    /// let uploader = SubprocessUploader::new(
    ///     Arc::new(SystemTimeProvider),
    ///     UploaderConfig::default(),
    /// );
    /// ```
    pub fn new(time_provider: Arc<dyn TimeProvider>, config: UploaderConfig) -> Self {
        Self {
            time_provider,
            config,
        }
    }

    /// Filter environment variables to allowlist only
    fn filter_env<I>(&self, env: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        env.into_iter()
            .filter(|(k, _)| self.config.env_allowlist.contains(k))
            .collect()
    }

    /// Expand the argument template for one folder
    fn expand_args(&self, folder: &Path) -> Vec<String> {
        let folder = folder.to_string_lossy();
        self.config
            .args
            .iter()
            .map(|arg| arg.replace(FOLDER_PLACEHOLDER, &folder))
            .collect()
    }

    /// Spawn the uploader and wait for it, honouring the optional timeout.
    ///
    /// The deadline covers draining the output too, so a background process
    /// that keeps the pipes open cannot outlive it.
    async fn spawn_and_wait(&self, args: &[String]) -> Result<std::process::Output, UploadError> {
        let env = self.filter_env(std::env::vars());

        let mut command = Command::new(&self.config.program);
        command
            .args(args)
            .env_clear()
            .envs(&env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group: a timeout stops everything the uploader started
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| UploadError::SpawnFailed(format!("{}: {}", self.config.program, e)))?;
        // Still needed after the child is reaped, to signal its group
        let pid = child.id();

        // Drain both pipes concurrently so a chatty uploader never blocks on a full pipe
        let mut stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
        let mut stderr_task = tokio::spawn(read_pipe(child.stderr.take()));

        let finished = async {
            let status = child
                .wait()
                .await
                .map_err(|e| UploadError::IoError(e.to_string()))?;
            let stdout = (&mut stdout_task)
                .await
                .map_err(|e| UploadError::IoError(e.to_string()))?;
            let stderr = (&mut stderr_task)
                .await
                .map_err(|e| UploadError::IoError(e.to_string()))?;
            Ok::<_, UploadError>(std::process::Output {
                status,
                stdout,
                stderr,
            })
        };

        let Some(limit) = self.config.timeout else {
            return finished.await;
        };

        let waited = timeout(limit, finished).await;
        match waited {
            Ok(output) => output,
            Err(_) => {
                terminate(&mut child, pid).await;
                stdout_task.abort();
                stderr_task.abort();
                Err(UploadError::Timeout(limit.as_millis() as i64))
            }
        }
    }

    /// Build upload report from process output
    fn build_report(&self, output: std::process::Output, duration_ms: i64) -> UploadReport {
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        UploadReport {
            outcome: interpret_output(&text, &self.config.success_markers),
            output: text,
            exit_code: output.status.code(),
            duration_ms,
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            warn!(error = %e, "Failed to read uploader output");
        }
    }
    buf
}

/// Stop a timed-out uploader and its process group: SIGTERM first, then
/// SIGKILL for whatever is left
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = pid {
            let group = Pid::from_raw(pid as i32);
            info!(pgid = %pid, "Sending SIGTERM to timed-out uploader");
            if killpg(group, Signal::SIGTERM).is_ok() {
                let grace = Duration::from_millis(GRACEFUL_KILL_TIMEOUT_MS as u64);
                match timeout(grace, child.wait()).await {
                    Ok(_) => info!(pgid = %pid, "Uploader exited after SIGTERM"),
                    Err(_) => warn!(pgid = %pid, "Uploader did not exit after SIGTERM, sending SIGKILL"),
                }
            }
            // Background children may survive the leader
            match killpg(group, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => warn!(pgid = %pid, error = %e, "Failed to kill uploader group"),
            }
        }
    }

    if let Ok(None) = child.try_wait() {
        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill uploader");
        }
    }
}

#[async_trait]
impl Uploader for SubprocessUploader {
    async fn upload(&self, folder: &Path) -> Result<UploadReport, UploadError> {
        let args = self.expand_args(folder);
        let start_time = self.time_provider.now_millis();

        info!(
            program = %self.config.program,
            args = ?args,
            timeout_ms = ?self.config.timeout.map(|t| t.as_millis()),
            "Starting uploader"
        );

        let output = self.spawn_and_wait(&args).await?;
        let duration_ms = self.time_provider.now_millis() - start_time;
        let report = self.build_report(output, duration_ms);

        info!(
            program = %self.config.program,
            duration_ms = %duration_ms,
            exit_code = ?report.exit_code,
            outcome = ?report.outcome,
            "Uploader finished"
        );

        Ok(report)
    }

    fn locate_program(&self) -> Option<PathBuf> {
        which::which(&self.config.program).ok()
    }
}
