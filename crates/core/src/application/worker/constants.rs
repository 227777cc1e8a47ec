// Worker constants (no magic values)
use std::time::Duration;

/// Fallback wake-up when no enqueue signal arrives (5s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long the daemon waits for an in-flight upload after shutdown (30s)
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Grace period between SIGTERM and SIGKILL for a timed-out uploader (5 seconds)
pub const GRACEFUL_KILL_TIMEOUT_MS: i64 = 5000;
