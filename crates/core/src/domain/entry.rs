// Queue Entry Domain Model

use serde::{Deserialize, Serialize};

use super::folder::FolderName;

/// Entry ID (UUID v4)
pub type EntryId = String;

/// Job number shown to users as `#N` (starts at 1)
pub type Ticket = u64;

/// Opaque identity of whoever asked for an upload (a Telegram chat id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(pub i64);

impl std::fmt::Display for RequesterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pending upload job tying a local folder to the chat that requested it.
///
/// Owned by the queue until the worker claims it. A claimed entry is
/// never put back, whatever the upload outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub ticket: Ticket,
    pub folder: FolderName,
    pub requester: RequesterId,
    pub enqueued_at: i64, // epoch ms
}

impl QueueEntry {
    pub fn new(
        id: impl Into<String>,
        ticket: Ticket,
        folder: FolderName,
        requester: RequesterId,
        enqueued_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            ticket,
            folder,
            requester,
            enqueued_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requester_display() {
        assert_eq!(RequesterId(-100123).to_string(), "-100123");
    }

    #[test]
    fn test_entry_serializes_folder_as_plain_string() {
        let entry = QueueEntry::new(
            "entry-1",
            7,
            FolderName::parse("holiday").unwrap(),
            RequesterId(42),
            1000,
        );

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["folder"], "holiday");
        assert_eq!(json["requester"], 42);
        assert_eq!(json["ticket"], 7);
    }
}
