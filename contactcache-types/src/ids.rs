//! Identifier types used throughout the cache.
//!
//! Backends address records with opaque strings. Internally every record is
//! addressed by a [`RecordHandle`], a dense numeric value parsed out of the
//! trailing numeric segment of the backend identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend-native record identifier (e.g. `"qtcontacts:tracker::42"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    /// Wraps a backend identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the canonical backend identifier for a handle.
    #[must_use]
    pub fn for_handle(handle: RecordHandle) -> Self {
        Self(format!("contacts::{}", handle.get()))
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the internal handle, or `None` if the identifier is malformed.
    #[must_use]
    pub fn handle(&self) -> Option<RecordHandle> {
        RecordHandle::from_backend_id(&self.0)
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BackendId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Dense internal identifier for a record.
///
/// Totally ordered and `Copy`, so ordered views can hold plain handles.
/// The value zero is reserved and never produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordHandle(u32);

impl RecordHandle {
    /// Creates a handle from a raw value. Returns `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Parses the trailing numeric segment of a backend identifier.
    ///
    /// Accepts `"42"`, `"contacts::42"`, `"urn:contact/42"` and similar.
    /// Empty, non-numeric, zero or overflowing suffixes yield `None`.
    #[must_use]
    pub fn from_backend_id(id: &str) -> Option<Self> {
        let id = id.trim();
        let digits_start = id
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)?;

        // The numeric run must be the whole identifier or follow a separator.
        if digits_start > 0 {
            let sep = id[..digits_start].chars().next_back()?;
            if !matches!(sep, ':' | '/' | '#' | '-' | '_' | '.') {
                return None;
            }
        }

        id[digits_start..].parse::<u32>().ok().and_then(Self::new)
    }
}

impl fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for RecordHandle {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_backend_id(s).ok_or_else(|| crate::Error::InvalidIdentifier(s.to_string()))
    }
}
