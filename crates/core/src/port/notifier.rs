// Notifier Port
// Delivers notices back to whoever requested an upload

use crate::domain::{Notice, RequesterId};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notice to a requester
    async fn notify(&self, requester: RequesterId, notice: Notice) -> Result<(), NotifyError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Notifier that records every notice it is given
    #[derive(Default, Clone)]
    pub struct RecordingNotifier {
        sent: Arc<Mutex<Vec<(RequesterId, Notice)>>>,
        fail: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// A notifier whose deliveries always fail (still records the attempt)
        pub fn new_failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<(RequesterId, Notice)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn notices(&self) -> Vec<Notice> {
            self.sent().into_iter().map(|(_, n)| n).collect()
        }

        pub fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, requester: RequesterId, notice: Notice) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push((requester, notice));
            if self.fail {
                return Err(NotifyError::DeliveryFailed("mock failure".to_string()));
            }
            Ok(())
        }
    }
}
