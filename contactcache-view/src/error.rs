//! Error types for the view registry.

use contactcache_types::ViewId;
use thiserror::Error;

/// Result type for view operations.
pub type ViewResult<T> = Result<T, ViewError>;

/// Errors that can occur in view operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    /// No view is registered under the id.
    #[error("unknown view: {0}")]
    UnknownView(ViewId),
}
