// Panic isolation helpers for the upload task
use std::any::Any;
use tokio::task::JoinError;
use tracing::error;

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Turn a failed join of the upload task into diagnostic text for the requester
pub fn describe_join_error(join_err: JoinError) -> String {
    if join_err.is_panic() {
        let msg = panic_message(join_err.into_panic().as_ref());
        error!(panic_msg = %msg, "Upload task panicked");
        format!("uploader panicked: {}", msg)
    } else {
        error!("Upload task cancelled");
        "upload task was cancelled".to_string()
    }
}
