// Port Layer - Interfaces for external dependencies

pub mod folder_catalog;
pub mod id_provider; // For deterministic testing
pub mod notifier;
pub mod system_probe;
pub mod time_provider;
pub mod uploader;

// Re-exports
pub use folder_catalog::{CatalogError, FolderCatalog};
pub use id_provider::IdProvider;
pub use notifier::{Notifier, NotifyError};
pub use system_probe::{SystemMetrics, SystemProbe};
pub use time_provider::TimeProvider;
pub use uploader::{UploadError, UploadOutcome, UploadReport, Uploader};
