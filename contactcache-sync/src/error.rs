//! Error types for the cache and its fetch pipeline.

use contactcache_store::StoreError;
use contactcache_view::ViewError;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type returned by a [`ContactBackend`](crate::ContactBackend).
pub type BackendResult<T> = Result<T, BackendError>;

/// A failure reported by the contacts backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that can occur in cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend failed a query, save or removal.
    #[error("backend error: {0}")]
    Backend(String),

    /// Record store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// View registry error.
    #[error("view error: {0}")]
    View(#[from] ViewError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<BackendError> for CacheError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err.0)
    }
}
