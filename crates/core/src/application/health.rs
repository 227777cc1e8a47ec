// Health report - what the `/debug` command shows
//
// Uploader availability, library root access, host resources, queue state.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::queue::UploadQueue;
use super::worker::{WorkerState, WorkerStatus};
use crate::port::{FolderCatalog, SystemMetrics, SystemProbe, Uploader};

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub version: String,
    /// Resolved uploader executable, `None` when it cannot be found
    pub uploader_program: Option<String>,
    pub library_root: String,
    pub library_writable: bool,
    pub library_error: Option<String>,
    pub folders_available: Option<usize>,
    pub queue_length: usize,
    pub tickets_issued: u64,
    /// Folder currently uploading, if any
    pub uploading: Option<String>,
    pub system: SystemMetrics,
}

impl HealthReport {
    /// Everything needed for uploads to work
    pub fn is_healthy(&self) -> bool {
        self.uploader_program.is_some() && self.library_writable
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

pub struct HealthService {
    queue: Arc<UploadQueue>,
    catalog: Arc<dyn FolderCatalog>,
    uploader: Arc<dyn Uploader>,
    probe: Arc<dyn SystemProbe>,
    worker: WorkerStatus,
}

impl HealthService {
    pub fn new(
        queue: Arc<UploadQueue>,
        catalog: Arc<dyn FolderCatalog>,
        uploader: Arc<dyn Uploader>,
        probe: Arc<dyn SystemProbe>,
        worker: WorkerStatus,
    ) -> Self {
        Self {
            queue,
            catalog,
            uploader,
            probe,
            worker,
        }
    }

    pub async fn report(&self) -> HealthReport {
        let uploader_program = self
            .uploader
            .locate_program()
            .map(|p| p.display().to_string());
        if uploader_program.is_none() {
            warn!("Uploader program not found");
        }

        let (library_writable, library_error) = match self.catalog.check_writable().await {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };

        let folders_available = self.catalog.list().await.ok().map(|f| f.len());

        let uploading = match self.worker.current() {
            WorkerState::Processing(entry) => Some(entry.folder.to_string()),
            WorkerState::Idle => None,
        };

        let report = HealthReport {
            version: crate::VERSION.to_string(),
            uploader_program,
            library_root: self.catalog.root().display().to_string(),
            library_writable,
            library_error,
            folders_available,
            queue_length: self.queue.len(),
            tickets_issued: self.queue.total_enqueued(),
            uploading,
            system: self.probe.get_metrics().await,
        };

        debug!(report = %report.to_json_pretty(), "Health report collected");
        report
    }
}
