// Application Layer - Use Cases and Business Logic

pub mod cleanup;
pub mod enqueue;
pub mod health;
pub mod history;
pub mod queue;
pub mod worker;

// Re-exports
pub use cleanup::{CleanupReport, CleanupService};
pub use enqueue::{EnqueueReport, EnqueueService, RejectReason, Rejected};
pub use health::{HealthReport, HealthService};
pub use history::UploadHistory;
pub use queue::{Enqueued, UploadQueue};
pub use worker::{
    shutdown_channel, ShutdownSender, ShutdownToken, Worker, WorkerState, WorkerStatus,
};
