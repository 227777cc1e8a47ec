// Enqueue Use Case
//
// Checks every requested folder against the catalog and appends the ones
// that exist. Rejections are reported to the requester right away and never
// touch the queue.

use std::sync::Arc;
use tracing::{info, warn};

use super::queue::{Enqueued, UploadQueue};
use crate::domain::{FolderName, Notice, RequesterId};
use crate::error::{AppError, Result};
use crate::port::{FolderCatalog, Notifier};

/// Why a requested folder was not queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NotFound,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub folder: String,
    pub reason: RejectReason,
}

/// Outcome of one enqueue request, in request order
#[derive(Debug, Default, Clone)]
pub struct EnqueueReport {
    pub accepted: Vec<Enqueued>,
    pub rejected: Vec<Rejected>,
}

pub struct EnqueueService {
    queue: Arc<UploadQueue>,
    catalog: Arc<dyn FolderCatalog>,
    notifier: Arc<dyn Notifier>,
}

impl EnqueueService {
    pub fn new(
        queue: Arc<UploadQueue>,
        catalog: Arc<dyn FolderCatalog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            queue,
            catalog,
            notifier,
        }
    }

    /// Queue each of `folders` for `requester`
    ///
    /// # Errors
    /// - AppError::Validation if `folders` is empty
    pub async fn request<S: AsRef<str>>(
        &self,
        requester: RequesterId,
        folders: &[S],
    ) -> Result<EnqueueReport> {
        if folders.is_empty() {
            return Err(AppError::Validation(
                "at least one folder name is required".to_string(),
            ));
        }

        let mut report = EnqueueReport::default();

        for raw in folders {
            let raw = raw.as_ref();
            match self.check(raw).await {
                Ok(folder) => {
                    let enqueued = self.queue.enqueue(folder, requester);
                    info!(
                        requester = %requester,
                        folder = %enqueued.entry.folder,
                        ticket = enqueued.entry.ticket,
                        position = enqueued.position,
                        "Folder queued for upload"
                    );
                    report.accepted.push(enqueued);
                }
                Err(reason) => {
                    info!(requester = %requester, folder = %raw, reason = ?reason, "Folder rejected");
                    self.reject(requester, raw, &reason).await;
                    report.rejected.push(Rejected {
                        folder: raw.to_string(),
                        reason,
                    });
                }
            }
        }

        Ok(report)
    }

    async fn check(&self, raw: &str) -> std::result::Result<FolderName, RejectReason> {
        let folder = FolderName::parse(raw).map_err(|e| RejectReason::Invalid(e.to_string()))?;

        match self.catalog.resolve(&folder).await {
            Ok(Some(_)) => Ok(folder),
            Ok(None) => Err(RejectReason::NotFound),
            Err(e) => {
                warn!(folder = %folder, error = %e, "Catalog lookup failed");
                Err(RejectReason::Invalid(e.to_string()))
            }
        }
    }

    async fn reject(&self, requester: RequesterId, raw: &str, reason: &RejectReason) {
        let notice = match reason {
            RejectReason::NotFound => Notice::FolderNotFound {
                folder: raw.to_string(),
            },
            RejectReason::Invalid(why) => Notice::InvalidFolder {
                folder: raw.to_string(),
                reason: why.clone(),
            },
        };

        if let Err(e) = self.notifier.notify(requester, notice).await {
            warn!(requester = %requester, error = %e, "Failed to deliver rejection notice");
        }
    }
}
