//! Error types for the sync engine.

use kvsync_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The store failed a read or write.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A write was issued on an engine whose store was unavailable at
    /// construction.
    #[error("store was unavailable when the engine was created")]
    StoreUnavailable,

    /// A batch write named a key the engine does not track.
    #[error("key {0:?} is not tracked by this engine")]
    UntrackedKey(String),

    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No tokio runtime was available to drive the poll timer.
    #[error("no tokio runtime available for the poll timer")]
    NoRuntime,
}

impl SyncError {
    /// Returns true if repeating the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Storage(StorageError::Io(_)))
    }
}
