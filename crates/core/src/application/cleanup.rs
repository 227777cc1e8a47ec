// Cleanup Use Case
//
// Removes empty directories from the library and forgets old upload
// records. Folders that are queued or uploading are left alone even when
// empty.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::history::UploadHistory;
use super::queue::UploadQueue;
use super::worker::{WorkerState, WorkerStatus};
use crate::error::Result;
use crate::port::FolderCatalog;

/// Upload records older than this are pruned
pub const HISTORY_MAX_AGE: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Removed directories relative to the library root
    pub removed_dirs: Vec<String>,
    pub pruned_records: usize,
}

pub struct CleanupService {
    queue: Arc<UploadQueue>,
    catalog: Arc<dyn FolderCatalog>,
    worker: WorkerStatus,
    history: Arc<UploadHistory>,
    max_age: Duration,
}

impl CleanupService {
    pub fn new(
        queue: Arc<UploadQueue>,
        catalog: Arc<dyn FolderCatalog>,
        worker: WorkerStatus,
        history: Arc<UploadHistory>,
    ) -> Self {
        Self {
            queue,
            catalog,
            worker,
            history,
            max_age: HISTORY_MAX_AGE,
        }
    }

    /// # Errors
    /// - AppError::Catalog if the library cannot be walked
    pub async fn run(&self) -> Result<CleanupReport> {
        // Queue first, then the worker: a claimed entry is published before
        // it leaves the queue.
        let mut keep: Vec<_> = self.queue.peek_all().into_iter().map(|e| e.folder).collect();
        if let WorkerState::Processing(entry) = self.worker.current() {
            keep.push(entry.folder);
        }

        let removed_dirs = self.catalog.remove_empty_dirs(&keep).await?;
        let pruned_records = self.history.prune_older_than(self.max_age);

        info!(
            removed_dirs = removed_dirs.len(),
            pruned_records,
            kept = keep.len(),
            "Cleanup finished"
        );
        Ok(CleanupReport {
            removed_dirs,
            pruned_records,
        })
    }
}
