// Notices sent back to the requester

use serde::Serialize;

use super::entry::QueueEntry;

/// Something the requester should be told about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Requested folder does not exist under the library root (never queued)
    FolderNotFound { folder: String },

    /// Requested folder name was rejected before touching the filesystem
    InvalidFolder { folder: String, reason: String },

    /// Upload finished and the collaborator reported success
    UploadSucceeded { entry: QueueEntry, output: String },

    /// Upload failed; `output` is the raw collaborator output or error text
    UploadFailed { entry: QueueEntry, output: String },
}

impl Notice {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Notice::UploadSucceeded { .. })
    }

    /// The queue entry this notice is about, if it was ever queued
    pub fn entry(&self) -> Option<&QueueEntry> {
        match self {
            Notice::UploadSucceeded { entry, .. } | Notice::UploadFailed { entry, .. } => {
                Some(entry)
            }
            Notice::FolderNotFound { .. } | Notice::InvalidFolder { .. } => None,
        }
    }
}
