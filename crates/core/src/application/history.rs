// Upload History - bounded record of finished uploads for `/status`

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::domain::{CompletedUpload, QueueEntry, RequesterId};
use crate::port::TimeProvider;

/// Records kept before the oldest is dropped
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Oldest first; never longer than `capacity`
pub struct UploadHistory {
    records: Mutex<VecDeque<CompletedUpload>>,
    capacity: usize,
    time_provider: Arc<dyn TimeProvider>,
}

impl UploadHistory {
    pub fn new(time_provider: Arc<dyn TimeProvider>, capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            time_provider,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<CompletedUpload>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remember that `entry` finished now
    pub fn record(&self, entry: QueueEntry, succeeded: bool) {
        let finished_at = self.time_provider.now_millis();
        let mut records = self.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(CompletedUpload {
            entry,
            succeeded,
            finished_at,
        });
    }

    /// Up to `limit` uploads of `requester`, newest first
    pub fn recent_for(&self, requester: RequesterId, limit: usize) -> Vec<CompletedUpload> {
        self.lock()
            .iter()
            .rev()
            .filter(|r| r.entry.requester == requester)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drop records that finished more than `max_age` ago
    pub fn prune_older_than(&self, max_age: Duration) -> usize {
        let cutoff = self.time_provider.now_millis() - max_age.as_millis() as i64;
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| r.finished_at >= cutoff);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
