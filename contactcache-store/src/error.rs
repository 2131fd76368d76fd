//! Error types for the record store.

use contactcache_types::RecordHandle;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backend identifier carries no usable handle.
    #[error("invalid backend identifier: {0:?}")]
    InvalidIdentifier(String),

    /// No entry exists for the handle.
    #[error("record not found: {0}")]
    NotFound(RecordHandle),

    /// The entry is still referenced and cannot be evicted.
    #[error("record is pinned: {0}")]
    Pinned(RecordHandle),
}
