//! Cache configuration.

use crate::error::CacheResult;
use contactcache_types::{DisplayLabelOrder, ListKind, SortOrder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the cache and its fetch pipeline.
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Quiet period after a change notification before changes are fetched.
    pub debounce_window_ms: u64,
    /// Longest a change notification waits, however busy the backend is.
    pub debounce_max_wait_ms: u64,
    /// Records per page requested from the backend.
    pub page_size: usize,
    /// How long an unreferenced record stays resident.
    pub expiry_grace_ms: u64,
    /// Sort key for list queries.
    pub sort_order: SortOrder,
    /// Name order for generated display labels.
    pub display_label_order: DisplayLabelOrder,
    /// Lists to fetch, in order.
    pub pipeline: Vec<ListKind>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: 300,
            debounce_max_wait_ms: 3000,
            page_size: 100,
            expiry_grace_ms: 30_000,
            sort_order: SortOrder::default(),
            display_label_order: DisplayLabelOrder::default(),
            pipeline: ListKind::ALL.to_vec(),
        }
    }
}

impl CacheConfig {
    pub fn from_json(json: &str) -> CacheResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn debounce_max_wait(&self) -> Duration {
        Duration::from_millis(self.debounce_max_wait_ms)
    }

    pub fn expiry_grace(&self) -> Duration {
        Duration::from_millis(self.expiry_grace_ms)
    }

    /// Page size, never zero.
    pub fn page_size(&self) -> usize {
        self.page_size.max(1)
    }
}
