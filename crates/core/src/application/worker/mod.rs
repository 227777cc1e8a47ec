// Worker - Upload loop draining the queue one entry at a time

pub mod constants;
mod panic_guard;
mod shutdown;

pub use panic_guard::{describe_join_error, panic_message};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::application::history::UploadHistory;
use crate::application::queue::UploadQueue;
use crate::domain::{Notice, QueueEntry};
use crate::port::{FolderCatalog, Notifier, Uploader};

/// What the worker is doing right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Processing(QueueEntry),
}

/// Read-only view of the worker state, usable after the worker is spawned
#[derive(Clone)]
pub struct WorkerStatus {
    rx: watch::Receiver<WorkerState>,
}

impl WorkerStatus {
    pub fn current(&self) -> WorkerState {
        self.rx.borrow().clone()
    }
}

/// Worker processes queued folders sequentially
///
/// One upload at a time; the loop is blocked while the uploader runs.
/// Every dequeued entry yields exactly one notice and is never re-queued.
pub struct Worker {
    queue: Arc<UploadQueue>,
    catalog: Arc<dyn FolderCatalog>,
    uploader: Arc<dyn Uploader>,
    notifier: Arc<dyn Notifier>,
    history: Option<Arc<UploadHistory>>,
    state: watch::Sender<WorkerState>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(
        queue: Arc<UploadQueue>,
        catalog: Arc<dyn FolderCatalog>,
        uploader: Arc<dyn Uploader>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            queue,
            catalog,
            uploader,
            notifier,
            history: None,
            state,
            poll_interval: constants::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Record every finished entry in `history`
    pub fn with_history(mut self, history: Arc<UploadHistory>) -> Self {
        self.history = Some(history);
        self
    }

    /// Override the fallback wake-up interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            rx: self.state.subscribe(),
        }
    }

    /// Run worker loop with graceful shutdown support
    ///
    /// Shutdown is honoured between uploads; an upload in flight always
    /// runs to completion.
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "Upload worker started");
        loop {
            if shutdown.is_shutdown() {
                info!("Upload worker shutting down");
                break;
            }
            if self.process_next_entry().await {
                continue;
            }
            tokio::select! {
                _ = self.queue.wait_for_entry() => {},
                _ = sleep(self.poll_interval) => {},
                _ = shutdown.wait() => {
                    info!("Upload worker interrupted during idle");
                    break;
                }
            }
        }
        info!("Upload worker stopped");
    }

    /// One tick: process the head entry if there is one (returns true if so)
    pub async fn process_next_entry(&self) -> bool {
        // Published before the entry leaves the queue, so /status never
        // misses it in between.
        let claimed = self.queue.claim_head(|entry| {
            self.state.send_replace(WorkerState::Processing(entry.clone()));
        });
        let Some(entry) = claimed else {
            return false;
        };

        info!(
            entry_id = %entry.id,
            ticket = entry.ticket,
            folder = %entry.folder,
            requester = %entry.requester,
            "Processing upload"
        );

        let requester = entry.requester;
        let notice = self.upload_entry(entry).await;

        if let (Some(history), Some(done)) = (&self.history, notice.entry()) {
            history.record(done.clone(), !notice.is_failure());
        }

        if let Err(e) = self.notifier.notify(requester, notice).await {
            warn!(requester = %requester, error = %e, "Failed to deliver upload notice");
        }

        self.state.send_replace(WorkerState::Idle);
        true
    }

    async fn upload_entry(&self, entry: QueueEntry) -> Notice {
        let path = match self.catalog.resolve(&entry.folder).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!(folder = %entry.folder, "Folder disappeared before upload");
                let output = format!("folder '{}' no longer exists", entry.folder);
                return Notice::UploadFailed { entry, output };
            }
            Err(e) => {
                error!(folder = %entry.folder, error = %e, "Catalog lookup failed");
                return Notice::UploadFailed {
                    entry,
                    output: e.to_string(),
                };
            }
        };

        // Run on its own task so a panicking uploader cannot take the loop down
        let uploader = Arc::clone(&self.uploader);
        let handle = tokio::spawn(async move { uploader.upload(&path).await });

        match handle.await {
            Ok(Ok(report)) if report.is_success() => {
                info!(
                    ticket = entry.ticket,
                    duration_ms = report.duration_ms,
                    "Upload completed"
                );
                Notice::UploadSucceeded {
                    entry,
                    output: report.output,
                }
            }
            Ok(Ok(report)) => {
                warn!(
                    ticket = entry.ticket,
                    exit_code = ?report.exit_code,
                    "Upload reported failure"
                );
                Notice::UploadFailed {
                    entry,
                    output: report.output,
                }
            }
            Ok(Err(e)) => {
                error!(ticket = entry.ticket, error = %e, "Uploader could not run");
                Notice::UploadFailed {
                    entry,
                    output: e.to_string(),
                }
            }
            Err(join_err) => Notice::UploadFailed {
                entry,
                output: describe_join_error(join_err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FolderName, RequesterId};
    use crate::port::folder_catalog::mocks::InMemoryCatalog;
    use crate::port::id_provider::SequentialIdProvider;
    use crate::port::notifier::mocks::RecordingNotifier;
    use crate::port::time_provider::SystemTimeProvider;
    use crate::port::uploader::mocks::{MockBehavior, MockUploader};

    struct Harness {
        queue: Arc<UploadQueue>,
        catalog: InMemoryCatalog,
        uploader: Arc<MockUploader>,
        notifier: RecordingNotifier,
        worker: Worker,
    }

    fn harness(uploader: MockUploader, folders: &[&str]) -> Harness {
        let queue = Arc::new(UploadQueue::new(
            Arc::new(SequentialIdProvider::default()),
            Arc::new(SystemTimeProvider),
        ));
        let catalog = InMemoryCatalog::new(folders.iter().copied());
        let uploader = Arc::new(uploader);
        let notifier = RecordingNotifier::new();
        let worker = Worker::new(
            Arc::clone(&queue),
            Arc::new(catalog.clone()),
            uploader.clone(),
            Arc::new(notifier.clone()),
        );
        Harness {
            queue,
            catalog,
            uploader,
            notifier,
            worker,
        }
    }

    fn enqueue(h: &Harness, name: &str, requester: i64) {
        h.queue
            .enqueue(FolderName::parse(name).unwrap(), RequesterId(requester));
    }

    #[tokio::test]
    async fn test_tick_on_empty_queue_is_noop() {
        let h = harness(MockUploader::new_success(), &[]);
        assert!(!h.worker.process_next_entry().await);
        assert_eq!(h.notifier.count(), 0);
        assert_eq!(h.uploader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_notice_goes_to_requester() {
        let h = harness(MockUploader::new_success(), &["A"]);
        enqueue(&h, "A", 99);

        assert!(h.worker.process_next_entry().await);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, RequesterId(99));
        assert!(matches!(sent[0].1, Notice::UploadSucceeded { .. }));
        assert_eq!(h.uploader.calls(), vec![std::path::PathBuf::from("/library/A")]);
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_reported_once_and_not_requeued() {
        let h = harness(MockUploader::new_failure("quota exceeded"), &["A"]);
        enqueue(&h, "A", 1);

        assert!(h.worker.process_next_entry().await);
        assert!(!h.worker.process_next_entry().await);

        let notices = h.notifier.notices();
        assert_eq!(notices.len(), 1);
        match &notices[0] {
            Notice::UploadFailed { output, .. } => assert_eq!(output, "quota exceeded"),
            other => panic!("unexpected notice: {:?}", other),
        }
        assert_eq!(h.uploader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_uploader_error_becomes_failure_with_error_text() {
        let h = harness(
            MockUploader::new(MockBehavior::Error("no such file or directory".into())),
            &["A"],
        );
        enqueue(&h, "A", 1);
        h.worker.process_next_entry().await;

        match &h.notifier.notices()[0] {
            Notice::UploadFailed { output, .. } => {
                assert!(output.contains("no such file or directory"))
            }
            other => panic!("unexpected notice: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_uploader_panic_is_isolated() {
        let uploader = MockUploader::new_success()
            .with_override("bad", MockBehavior::Panic("selenium exploded".into()));
        let h = harness(uploader, &["bad", "good"]);
        enqueue(&h, "bad", 1);
        enqueue(&h, "good", 1);

        assert!(h.worker.process_next_entry().await);
        assert!(h.worker.process_next_entry().await);

        let notices = h.notifier.notices();
        assert_eq!(notices.len(), 2);
        match &notices[0] {
            Notice::UploadFailed { output, .. } => assert!(output.contains("selenium exploded")),
            other => panic!("unexpected notice: {:?}", other),
        }
        assert!(matches!(notices[1], Notice::UploadSucceeded { .. }));
    }

    #[tokio::test]
    async fn test_folder_removed_after_enqueue() {
        let h = harness(MockUploader::new_success(), &["A"]);
        enqueue(&h, "A", 1);
        h.catalog.remove("A");

        h.worker.process_next_entry().await;

        assert_eq!(h.uploader.call_count(), 0);
        assert!(h.notifier.notices()[0].is_failure());
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_stop_processing() {
        let queue = Arc::new(UploadQueue::new(
            Arc::new(SequentialIdProvider::default()),
            Arc::new(SystemTimeProvider),
        ));
        let worker = Worker::new(
            Arc::clone(&queue),
            Arc::new(InMemoryCatalog::new(["A", "B"])),
            Arc::new(MockUploader::new_success()),
            Arc::new(RecordingNotifier::new_failing()),
        );
        queue.enqueue(FolderName::parse("A").unwrap(), RequesterId(1));
        queue.enqueue(FolderName::parse("B").unwrap(), RequesterId(1));

        assert!(worker.process_next_entry().await);
        assert!(worker.process_next_entry().await);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_entry_in_flight() {
        let (uploader, gate) = MockUploader::new_success().gated();
        let h = harness(uploader, &["A"]);
        let status = h.worker.status();
        enqueue(&h, "A", 5);

        let worker = Arc::new(h.worker);
        let ticking = {
            let worker = Arc::clone(&worker);
            tokio::spawn(async move { worker.process_next_entry().await })
        };

        // Wait until the uploader has been entered
        for _ in 0..100 {
            if h.uploader.call_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        match status.current() {
            WorkerState::Processing(entry) => assert_eq!(entry.folder.as_str(), "A"),
            WorkerState::Idle => panic!("worker should be processing"),
        }

        gate.add_permits(1);
        assert!(ticking.await.unwrap());
        assert_eq!(status.current(), WorkerState::Idle);
    }

    #[tokio::test]
    async fn test_entry_is_never_missing_from_status() {
        let (uploader, gate) = MockUploader::new_success().gated();
        let h = harness(uploader, &["A"]);
        let status = h.worker.status();
        enqueue(&h, "A", 5);

        let queue = Arc::clone(&h.queue);
        let worker = Arc::new(h.worker);
        let ticking = {
            let worker = Arc::clone(&worker);
            tokio::spawn(async move { worker.process_next_entry().await })
        };

        // Same read order as /status: queue snapshot, then worker state
        for _ in 0..200 {
            let queued = queue.peek_all().iter().any(|e| e.folder.as_str() == "A");
            let processing =
                matches!(status.current(), WorkerState::Processing(e) if e.folder.as_str() == "A");
            assert!(queued || processing, "entry vanished from both queue and worker");
            if processing && !queued {
                break;
            }
            tokio::task::yield_now().await;
        }

        gate.add_permits(1);
        assert!(ticking.await.unwrap());
    }

    #[tokio::test]
    async fn test_history_records_each_outcome() {
        let uploader = MockUploader::new_success()
            .with_override("B", MockBehavior::Failure("quota exceeded".into()));
        let h = harness(uploader, &["A", "B"]);
        enqueue(&h, "A", 7);
        enqueue(&h, "B", 7);
        enqueue(&h, "gone", 7);
        let history = Arc::new(UploadHistory::new(Arc::new(SystemTimeProvider), 10));
        let worker = h.worker.with_history(history.clone());

        while worker.process_next_entry().await {}

        let recent: Vec<(String, bool)> = history
            .recent_for(RequesterId(7), 5)
            .into_iter()
            .map(|r| (r.entry.folder.to_string(), r.succeeded))
            .collect();
        assert_eq!(
            recent,
            vec![
                ("gone".to_string(), false),
                ("B".to_string(), false),
                ("A".to_string(), true),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_drains_queue_and_stops_on_shutdown() {
        let h = harness(MockUploader::new_success(), &["A", "B", "C"]);
        let notifier = h.notifier.clone();
        let queue = Arc::clone(&h.queue);
        let worker = h.worker.with_poll_interval(Duration::from_millis(20));
        let (tx, token) = shutdown_channel();

        let running = tokio::spawn(async move { worker.run(token).await });

        for name in ["A", "B", "C"] {
            queue.enqueue(FolderName::parse(name).unwrap(), RequesterId(3));
        }
        for _ in 0..200 {
            if notifier.count() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let folders: Vec<String> = notifier
            .notices()
            .iter()
            .filter_map(|n| n.entry().map(|e| e.folder.to_string()))
            .collect();
        assert_eq!(folders, vec!["A", "B", "C"]);

        tx.shutdown();
        tokio::time::timeout(Duration::from_secs(1), running)
            .await
            .expect("worker should stop")
            .unwrap();
    }
}
