//! Core type definitions for ContactCache.
//!
//! This crate defines the value types shared by every layer of the cache:
//! - Backend identifiers and the dense [`RecordHandle`] derived from them
//! - The [`Contact`] record snapshot delivered by the backend
//! - Secondary lookup keys (normalized phone numbers, lowercased emails)
//! - View and source-list identifiers
//!
//! Nothing in here holds state; the record store and the views build on it.

mod contact;
mod ids;
mod keys;
mod view;

pub use contact::{Contact, DisplayLabelOrder, Presence, SortOrder};
pub use ids::{BackendId, RecordHandle};
pub use keys::{normalize_email, normalize_phone, phone_match_key, KeyKind, SecondaryKey};
pub use view::{ListKind, ViewId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid backend identifier: {0:?}")]
    InvalidIdentifier(String),
}
