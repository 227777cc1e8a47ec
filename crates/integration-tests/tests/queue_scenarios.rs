//! Queue Scenario Tests
//!
//! Enqueue, status and worker ticks against a real library directory.

use std::sync::Arc;
use std::time::Duration;

use folderbot_core::application::{
    shutdown_channel, CleanupService, EnqueueService, RejectReason, UploadHistory, UploadQueue,
    Worker, WorkerState,
};
use folderbot_core::domain::{Notice, RequesterId};
use folderbot_core::port::id_provider::SequentialIdProvider;
use folderbot_core::port::notifier::mocks::RecordingNotifier;
use folderbot_core::port::time_provider::SystemTimeProvider;
use folderbot_core::port::uploader::mocks::{MockBehavior, MockUploader};
use folderbot_core::port::FolderCatalog;
use folderbot_infra_system::LocalFolderCatalog;
use tempfile::TempDir;

const REQUESTER: RequesterId = RequesterId(4242);

struct Harness {
    _library: TempDir,
    queue: Arc<UploadQueue>,
    catalog: Arc<dyn FolderCatalog>,
    notifier: RecordingNotifier,
    enqueue: EnqueueService,
}

fn harness(folders: &[&str]) -> Harness {
    let library = tempfile::tempdir().unwrap();
    for folder in folders {
        std::fs::create_dir_all(library.path().join(folder)).unwrap();
    }

    let queue = Arc::new(UploadQueue::new(
        Arc::new(SequentialIdProvider::default()),
        Arc::new(SystemTimeProvider),
    ));
    let catalog: Arc<dyn FolderCatalog> =
        Arc::new(LocalFolderCatalog::new(library.path().to_string_lossy()));
    let notifier = RecordingNotifier::new();
    let enqueue = EnqueueService::new(queue.clone(), catalog.clone(), Arc::new(notifier.clone()));

    Harness {
        _library: library,
        queue,
        catalog,
        notifier,
        enqueue,
    }
}

impl Harness {
    fn worker(&self, uploader: Arc<MockUploader>) -> Worker {
        Worker::new(
            self.queue.clone(),
            self.catalog.clone(),
            uploader,
            Arc::new(self.notifier.clone()),
        )
    }

    fn pending(&self) -> Vec<String> {
        self.queue
            .peek_all()
            .into_iter()
            .map(|e| e.folder.to_string())
            .collect()
    }
}

/// Scenario: enqueue ["A","B"], both exist -> status shows both, two ticks
/// send two notices in enqueue order
#[tokio::test]
async fn test_two_folders_processed_in_order() {
    let h = harness(&["A", "B"]);
    let uploader = Arc::new(MockUploader::new_success());
    let worker = h.worker(uploader.clone());

    let report = h.enqueue.request(REQUESTER, &["A", "B"]).await.unwrap();
    assert_eq!(report.accepted.len(), 2);
    assert!(report.rejected.is_empty());
    assert_eq!(h.pending(), vec!["A", "B"]);

    assert!(worker.process_next_entry().await);
    assert!(worker.process_next_entry().await);
    assert!(!worker.process_next_entry().await, "queue should be drained");

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    let folders: Vec<_> = sent
        .iter()
        .map(|(to, notice)| {
            assert_eq!(*to, REQUESTER);
            assert!(matches!(notice, Notice::UploadSucceeded { .. }));
            notice.entry().unwrap().folder.to_string()
        })
        .collect();
    assert_eq!(folders, vec!["A", "B"]);

    let calls = uploader.calls();
    assert!(calls[0].ends_with("A"));
    assert!(calls[1].ends_with("B"));
    assert!(h.queue.is_empty());
}

/// Scenario: enqueue "missing" -> no queue mutation, one immediate failure notice
#[tokio::test]
async fn test_missing_folder_rejected_immediately() {
    let h = harness(&["A"]);

    let report = h.enqueue.request(REQUESTER, &["missing"]).await.unwrap();

    assert!(report.accepted.is_empty());
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].reason, RejectReason::NotFound);
    assert!(h.queue.is_empty());
    assert_eq!(h.queue.total_enqueued(), 0);
    assert!(h.pending().is_empty());

    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].is_failure());
    assert!(matches!(&notices[0], Notice::FolderNotFound { folder } if folder == "missing"));
}

/// A plain file with the requested name is not a folder
#[tokio::test]
async fn test_regular_file_is_not_a_folder() {
    let h = harness(&[]);
    std::fs::write(h.catalog.root().join("notes.txt"), b"hello").unwrap();

    let report = h.enqueue.request(REQUESTER, &["notes.txt"]).await.unwrap();

    assert!(report.accepted.is_empty());
    assert!(h.queue.is_empty());
    assert_eq!(h.notifier.count(), 1);
}

#[tokio::test]
async fn test_traversal_names_rejected_as_invalid() {
    let h = harness(&["A"]);

    let report = h
        .enqueue
        .request(REQUESTER, &["../etc", "A/../A", "/tmp"])
        .await
        .unwrap();

    assert!(report.accepted.is_empty());
    assert_eq!(report.rejected.len(), 3);
    assert!(report
        .rejected
        .iter()
        .all(|r| matches!(r.reason, RejectReason::Invalid(_))));
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn test_mixed_request_keeps_existing_folders() {
    let h = harness(&["A", "C"]);

    let report = h
        .enqueue
        .request(REQUESTER, &["A", "missing", "C"])
        .await
        .unwrap();

    assert_eq!(h.pending(), vec!["A", "C"]);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(h.notifier.count(), 1);
    assert_eq!(report.accepted[1].entry.ticket, 2);
}

/// Each entry is processed at most once, whatever the outcome
#[tokio::test]
async fn test_failed_entries_are_not_retried() {
    let h = harness(&["A", "B", "C"]);
    let uploader = Arc::new(
        MockUploader::new_success()
            .with_override("A", MockBehavior::Failure("network unreachable".into()))
            .with_override("B", MockBehavior::Panic("boom".into())),
    );
    let worker = h.worker(uploader.clone());

    h.enqueue.request(REQUESTER, &["A", "B", "C"]).await.unwrap();
    while worker.process_next_entry().await {}

    assert_eq!(uploader.call_count(), 3);

    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 3);
    assert!(
        matches!(&notices[0], Notice::UploadFailed { output, .. } if output.contains("network unreachable"))
    );
    assert!(matches!(&notices[1], Notice::UploadFailed { output, .. } if output.contains("boom")));
    assert!(matches!(&notices[2], Notice::UploadSucceeded { .. }));
    assert!(h.queue.is_empty());
}

#[tokio::test]
async fn test_folder_removed_after_enqueue_fails_once() {
    let h = harness(&["A"]);
    let uploader = Arc::new(MockUploader::new_success());
    let worker = h.worker(uploader.clone());

    h.enqueue.request(REQUESTER, &["A"]).await.unwrap();
    std::fs::remove_dir(h.catalog.root().join("A")).unwrap();

    assert!(worker.process_next_entry().await);

    assert_eq!(uploader.call_count(), 0);
    let notices = h.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert!(matches!(&notices[0], Notice::UploadFailed { .. }));
}

/// Running worker picks up entries as soon as they are enqueued
#[tokio::test]
async fn test_running_worker_drains_queue_and_stops() {
    let h = harness(&["A", "B", "C"]);
    let uploader = Arc::new(MockUploader::new_success());
    let worker = Arc::new(h.worker(uploader.clone()).with_poll_interval(Duration::from_secs(60)));
    let status = worker.status();

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let handle = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.run(shutdown_rx).await })
    };

    h.enqueue
        .request(REQUESTER, &["A", "B", "C"])
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.notifier.count() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("worker should process all entries");

    shutdown_tx.shutdown();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should stop after shutdown")
        .unwrap();

    let order: Vec<_> = h
        .notifier
        .notices()
        .iter()
        .map(|n| n.entry().unwrap().ticket)
        .collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert_eq!(status.current(), WorkerState::Idle);
}

/// A symlink below the root that leads elsewhere cannot be queued
#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_library_rejected() {
    let h = harness(&["A"]);
    let elsewhere = tempfile::tempdir().unwrap();
    std::os::unix::fs::symlink(elsewhere.path(), h.catalog.root().join("escape")).unwrap();

    let report = h.enqueue.request(REQUESTER, &["escape"]).await.unwrap();

    assert!(report.accepted.is_empty());
    assert!(matches!(&report.rejected[0].reason, RejectReason::Invalid(why) if why.contains("outside")));
    assert!(h.queue.is_empty());
    assert!(matches!(&h.notifier.notices()[0], Notice::InvalidFolder { .. }));
}

#[tokio::test]
async fn test_folder_with_surrounding_spaces_is_queued() {
    let h = harness(&[" notes "]);

    let report = h.enqueue.request(REQUESTER, &[" notes "]).await.unwrap();

    assert_eq!(report.accepted.len(), 1);
    assert_eq!(h.pending(), vec![" notes "]);
}

/// Cleanup removes empty folders, keeps queued ones, and forgets old records
#[tokio::test]
async fn test_cleanup_keeps_queued_folders() {
    let h = harness(&["queued", "stale/empty", "photos"]);
    std::fs::write(h.catalog.root().join("photos/cat.jpg"), b"jpg").unwrap();
    let worker = h.worker(Arc::new(MockUploader::new_success()));
    let history = Arc::new(UploadHistory::new(Arc::new(SystemTimeProvider), 10));
    let cleanup = CleanupService::new(
        h.queue.clone(),
        h.catalog.clone(),
        worker.status(),
        history.clone(),
    );

    h.enqueue.request(REQUESTER, &["queued"]).await.unwrap();
    let report = cleanup.run().await.unwrap();

    assert_eq!(report.removed_dirs, vec!["stale", "stale/empty"]);
    assert_eq!(report.pruned_records, 0);
    assert!(h.catalog.root().join("queued").is_dir());
    assert_eq!(h.catalog.list().await.unwrap(), vec!["photos", "queued"]);
}
