// Completed Upload Record

use serde::{Deserialize, Serialize};

use super::entry::QueueEntry;

/// An entry the worker is done with, kept for `/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedUpload {
    pub entry: QueueEntry,
    pub succeeded: bool,
    pub finished_at: i64, // epoch ms
}
