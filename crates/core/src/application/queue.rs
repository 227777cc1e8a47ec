// Upload Queue - in-memory FIFO shared by the enqueue use case and the worker

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;
use tracing::debug;

use crate::domain::{FolderName, QueueEntry, RequesterId, Ticket};
use crate::port::{IdProvider, TimeProvider};

/// Result of a successful append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    pub entry: QueueEntry,
    /// 1-based position in the queue right after the append
    pub position: usize,
}

struct Inner {
    entries: VecDeque<QueueEntry>,
    tickets_issued: Ticket,
}

/// Unbounded FIFO of pending uploads
///
/// Handlers only append, the worker is the only consumer. Duplicates are
/// allowed: the same folder can be queued any number of times.
pub struct UploadQueue {
    inner: Mutex<Inner>,
    wake: Notify,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl UploadQueue {
    pub fn new(id_provider: Arc<dyn IdProvider>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::new(),
                tickets_issued: 0,
            }),
            wake: Notify::new(),
            id_provider,
            time_provider,
        }
    }

    // Critical sections never panic mid-update, so a poisoned lock still holds a
    // consistent queue.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append to the tail and wake the worker
    pub fn enqueue(&self, folder: FolderName, requester: RequesterId) -> Enqueued {
        let id = self.id_provider.generate_id();
        let now = self.time_provider.now_millis();

        let enqueued = {
            let mut inner = self.lock();
            inner.tickets_issued += 1;
            let entry = QueueEntry::new(id, inner.tickets_issued, folder, requester, now);
            inner.entries.push_back(entry.clone());
            Enqueued {
                entry,
                position: inner.entries.len(),
            }
        };

        debug!(
            entry_id = %enqueued.entry.id,
            ticket = enqueued.entry.ticket,
            folder = %enqueued.entry.folder,
            position = enqueued.position,
            "Entry enqueued"
        );

        self.wake.notify_one();
        enqueued
    }

    /// Remove and return the head, `None` when empty
    pub fn dequeue_head(&self) -> Option<QueueEntry> {
        self.claim_head(|_| {})
    }

    /// Remove and return the head, running `on_claim` on it first.
    ///
    /// `on_claim` runs under the queue lock while the entry is still at the
    /// head, so a reader that snapshots the queue and then looks at whatever
    /// `on_claim` published always finds the entry in one of the two.
    /// It must not call back into the queue.
    pub fn claim_head<F>(&self, on_claim: F) -> Option<QueueEntry>
    where
        F: FnOnce(&QueueEntry),
    {
        let mut inner = self.lock();
        on_claim(inner.entries.front()?);
        inner.entries.pop_front()
    }

    /// Snapshot of the pending entries, head first
    pub fn peek_all(&self) -> Vec<QueueEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Number of tickets handed out since start (also the last ticket number)
    pub fn total_enqueued(&self) -> Ticket {
        self.lock().tickets_issued
    }

    /// Resolve once an enqueue happened since the last wake-up.
    ///
    /// A wake-up issued while nobody waits is kept, so an append that races
    /// with an empty `dequeue_head` is never missed.
    pub async fn wait_for_entry(&self) {
        self.wake.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::id_provider::SequentialIdProvider;
    use crate::port::time_provider::ManualTimeProvider;
    use std::time::Duration;

    fn queue() -> UploadQueue {
        UploadQueue::new(
            Arc::new(SequentialIdProvider::default()),
            Arc::new(ManualTimeProvider::new(1_000)),
        )
    }

    fn folder(name: &str) -> FolderName {
        FolderName::parse(name).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let q = queue();
        for name in ["A", "B", "C"] {
            q.enqueue(folder(name), RequesterId(1));
        }

        let drained: Vec<String> = std::iter::from_fn(|| q.dequeue_head())
            .map(|e| e.folder.to_string())
            .collect();
        assert_eq!(drained, vec!["A", "B", "C"]);
        assert!(q.dequeue_head().is_none());
    }

    #[test]
    fn test_enqueue_assigns_tickets_and_positions() {
        let q = queue();
        let first = q.enqueue(folder("A"), RequesterId(1));
        let second = q.enqueue(folder("B"), RequesterId(2));

        assert_eq!(first.entry.ticket, 1);
        assert_eq!(first.position, 1);
        assert_eq!(second.entry.ticket, 2);
        assert_eq!(second.position, 2);
        assert_eq!(first.entry.id, "entry-1");
        assert_eq!(first.entry.enqueued_at, 1_000);

        // Tickets keep counting after the queue drains
        q.dequeue_head();
        q.dequeue_head();
        let third = q.enqueue(folder("C"), RequesterId(1));
        assert_eq!(third.entry.ticket, 3);
        assert_eq!(third.position, 1);
        assert_eq!(q.total_enqueued(), 3);
    }

    #[test]
    fn test_claim_head_sees_head_before_removal() {
        let q = queue();
        q.enqueue(folder("A"), RequesterId(1));
        q.enqueue(folder("B"), RequesterId(1));

        let mut seen = None;
        let claimed = q.claim_head(|entry| seen = Some(entry.clone()));

        assert_eq!(seen, claimed);
        assert_eq!(claimed.unwrap().folder.as_str(), "A");
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_claim_head_on_empty_skips_callback() {
        let q = queue();
        let mut called = false;
        assert!(q.claim_head(|_| called = true).is_none());
        assert!(!called);
    }

    #[test]
    fn test_duplicates_allowed() {
        let q = queue();
        q.enqueue(folder("A"), RequesterId(1));
        q.enqueue(folder("A"), RequesterId(1));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_peek_all_does_not_mutate() {
        let q = queue();
        q.enqueue(folder("A"), RequesterId(1));
        q.enqueue(folder("B"), RequesterId(1));

        let snapshot: Vec<String> = q.peek_all().iter().map(|e| e.folder.to_string()).collect();
        assert_eq!(snapshot, vec!["A", "B"]);
        assert_eq!(q.len(), 2);
        assert!(!q.is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_entry_keeps_early_wakeup() {
        let q = queue();
        // Enqueue before anyone waits: the wake-up must not be lost
        q.enqueue(folder("A"), RequesterId(1));

        let woke = tokio::time::timeout(Duration::from_millis(200), q.wait_for_entry()).await;
        assert!(woke.is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_entry_blocks_while_empty() {
        let q = queue();
        let woke = tokio::time::timeout(Duration::from_millis(50), q.wait_for_entry()).await;
        assert!(woke.is_err());
    }
}
