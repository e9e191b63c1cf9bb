//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store cannot be used in this environment.
    #[error("store is unavailable")]
    Unavailable,

    /// A write would grow the store past its quota.
    #[error("quota exceeded: {requested} bytes requested, quota is {quota} bytes")]
    QuotaExceeded {
        /// Total size the store would have after the write.
        requested: usize,
        /// Maximum size of the store.
        quota: usize,
    },

    /// The environment refused access to the store.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The store's persisted content could not be parsed.
    #[error("store corrupted: {0}")]
    Corrupted(String),
}
