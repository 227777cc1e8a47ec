// Uploader Port
// Abstraction over the external upload tool (opaque subprocess boundary)

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Coarse outcome of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Success,
    Failure,
}

/// Result of one upload run
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub outcome: UploadOutcome,
    /// Captured output (stdout followed by stderr)
    pub output: String,
    pub exit_code: Option<i32>,
    pub duration_ms: i64,
}

impl UploadReport {
    pub fn is_success(&self) -> bool {
        self.outcome == UploadOutcome::Success
    }
}

/// Upload errors (the tool could not be run to completion)
#[derive(Error, Debug, Clone)]
pub enum UploadError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Upload timed out after {0}ms")]
    Timeout(i64),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Uploader trait
///
/// Implementations:
/// - SubprocessUploader: runs the external uploader CLI
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Recursively upload `folder` and report the outcome
    ///
    /// # Errors
    /// - UploadError::SpawnFailed if the tool cannot be started
    /// - UploadError::Timeout if a configured time limit is exceeded
    async fn upload(&self, folder: &Path) -> Result<UploadReport, UploadError>;

    /// Resolved location of the uploader program, `None` if it cannot be found
    fn locate_program(&self) -> Option<PathBuf>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Semaphore;

    /// Mock uploader behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Succeed with the given output
        Success(String),
        /// Report a failure with the given output
        Failure(String),
        /// Return an UploadError::SpawnFailed with message
        Error(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock Uploader for testing
    ///
    /// Records every folder it was asked to upload, in call order.
    pub struct MockUploader {
        behavior: MockBehavior,
        overrides: HashMap<String, MockBehavior>,
        calls: Arc<Mutex<Vec<PathBuf>>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockUploader {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                overrides: HashMap::new(),
                calls: Arc::new(Mutex::new(Vec::new())),
                gate: None,
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success("UPLOAD      : Done".to_string()))
        }

        pub fn new_failure(output: impl Into<String>) -> Self {
            Self::new(MockBehavior::Failure(output.into()))
        }

        /// Use a different behavior for folders whose last component is `folder_name`
        pub fn with_override(mut self, folder_name: impl Into<String>, behavior: MockBehavior) -> Self {
            self.overrides.insert(folder_name.into(), behavior);
            self
        }

        /// Block every upload until a permit is added to the returned semaphore
        pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            self.gate = Some(Arc::clone(&gate));
            (self, gate)
        }

        pub fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Uploader for MockUploader {
        async fn upload(&self, folder: &Path) -> Result<UploadReport, UploadError> {
            self.calls.lock().unwrap().push(folder.to_path_buf());

            if let Some(gate) = &self.gate {
                let permit = gate.acquire().await.expect("gate closed");
                permit.forget();
            }

            let name = folder
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let behavior = self
                .overrides
                .get(&name)
                .cloned()
                .unwrap_or_else(|| self.behavior.clone());

            match behavior {
                MockBehavior::Success(output) => Ok(UploadReport {
                    outcome: UploadOutcome::Success,
                    output,
                    exit_code: Some(0),
                    duration_ms: 10,
                }),
                MockBehavior::Failure(output) => Ok(UploadReport {
                    outcome: UploadOutcome::Failure,
                    output,
                    exit_code: Some(1),
                    duration_ms: 10,
                }),
                MockBehavior::Error(msg) => Err(UploadError::SpawnFailed(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
            }
        }

        fn locate_program(&self) -> Option<PathBuf> {
            Some(PathBuf::from("/usr/bin/mock-uploader"))
        }
    }
}
