//! View and source-list identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a registered view.
///
/// Also keys the per-view listener data attached to cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(u32);

impl ViewId {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// The backend queries whose ordered results the cache mirrors.
///
/// The fetch pipeline runs them in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Favorites,
    All,
    Online,
}

impl ListKind {
    /// All lists, in pipeline order.
    pub const ALL: [ListKind; 3] = [ListKind::Favorites, ListKind::All, ListKind::Online];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::All => "all",
            Self::Online => "online",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
