//! Error types for the tidesync refresh engine.

use tidesync_fetch::FetchError;

/// Top-level error type for tidesync.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Remote read failed: transport, unexpected status, or decode.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Local persistence (station/observation store or key-value store) failed.
    #[error("store error: {0}")]
    Store(String),

    /// A task body failed or panicked.
    #[error("task error: {0}")]
    Task(String),

    /// Scheduler coordination error (service stopped, channel closed).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SyncError>;
