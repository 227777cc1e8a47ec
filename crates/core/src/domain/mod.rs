// Domain Layer - Pure business logic and entities

pub mod entry;
pub mod error;
pub mod folder;
pub mod notice;
pub mod outcome;

// Re-exports
pub use entry::{EntryId, QueueEntry, RequesterId, Ticket};
pub use error::DomainError;
pub use folder::FolderName;
pub use notice::Notice;
pub use outcome::CompletedUpload;
