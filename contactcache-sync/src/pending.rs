//! Changes waiting for the next debounced flush.

use crate::backend::ChangeNotification;
use contactcache_types::{BackendId, RecordHandle};
use std::collections::BTreeMap;
use tracing::warn;

/// Records announced by the backend since the last flush.
///
/// Each record appears in at most one set; a removal supersedes any earlier
/// addition or change.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingChangeSet {
    pub added: BTreeMap<RecordHandle, BackendId>,
    pub changed: BTreeMap<RecordHandle, BackendId>,
    pub removed: BTreeMap<RecordHandle, BackendId>,
    /// The lists must be queried again even if nothing was added.
    pub relist: bool,
}

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty() && !self.relist
    }

    pub fn record(&mut self, notification: ChangeNotification) {
        match notification {
            ChangeNotification::Added(ids) => {
                for (handle, id) in resolve(ids) {
                    self.removed.remove(&handle);
                    self.changed.remove(&handle);
                    self.added.insert(handle, id);
                }
            }
            ChangeNotification::Changed(ids) => {
                for (handle, id) in resolve(ids) {
                    if !self.added.contains_key(&handle) && !self.removed.contains_key(&handle) {
                        self.changed.insert(handle, id);
                    }
                }
            }
            ChangeNotification::Removed(ids) => {
                for (handle, id) in resolve(ids) {
                    self.added.remove(&handle);
                    self.changed.remove(&handle);
                    self.removed.insert(handle, id);
                }
            }
        }
    }

    /// Puts back changes a failed flush took.
    ///
    /// Anything recorded since takes precedence. Removals are not restored:
    /// they were applied locally before the flush reached the backend.
    pub fn restore(&mut self, earlier: Self) {
        for (handle, id) in earlier.added {
            if self.removed.contains_key(&handle) {
                continue;
            }
            self.changed.remove(&handle);
            self.added.entry(handle).or_insert(id);
        }
        for (handle, id) in earlier.changed {
            if !self.added.contains_key(&handle) && !self.removed.contains_key(&handle) {
                self.changed.entry(handle).or_insert(id);
            }
        }
        self.relist |= earlier.relist;
    }

    /// Takes everything recorded so far, leaving the set empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

fn resolve(ids: Vec<BackendId>) -> impl Iterator<Item = (RecordHandle, BackendId)> {
    ids.into_iter().filter_map(|id| match id.handle() {
        Some(handle) => Some((handle, id)),
        None => {
            warn!(id = %id, "ignoring change notification for malformed identifier");
            None
        }
    })
}
