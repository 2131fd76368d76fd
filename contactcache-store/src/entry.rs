//! Cache entries.

use contactcache_types::{Contact, RecordHandle, SecondaryKey, ViewId};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryState {
    /// Known by handle only; no data has been asked for.
    #[default]
    Absent,
    /// Queued for the next batched fetch.
    Requested,
    /// The list-level fields are present.
    Fetched,
    /// Every detail field has been fetched.
    Complete,
    /// The backend deleted the record.
    Removed,
}

/// One record in the store.
pub struct CacheEntry {
    handle: RecordHandle,
    pub(crate) contact: Option<Contact>,
    pub(crate) state: EntryState,
    pub(crate) listener_data: HashMap<ViewId, Box<dyn Any + Send + Sync>>,
    pub(crate) keys: Vec<SecondaryKey>,
    pub(crate) view_refs: usize,
    pub(crate) usage: Arc<()>,
}

impl CacheEntry {
    pub(crate) fn new(handle: RecordHandle) -> Self {
        Self {
            handle,
            contact: None,
            state: EntryState::Absent,
            listener_data: HashMap::new(),
            keys: Vec::new(),
            view_refs: 0,
            usage: Arc::new(()),
        }
    }

    #[must_use]
    pub fn handle(&self) -> RecordHandle {
        self.handle
    }

    /// The latest snapshot, if one has been fetched.
    #[must_use]
    pub fn contact(&self) -> Option<&Contact> {
        self.contact.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Number of views whose rows hold this record.
    #[must_use]
    pub fn view_refs(&self) -> usize {
        self.view_refs
    }

    /// Number of live [`RecordGuard`](crate::RecordGuard)s.
    #[must_use]
    pub fn guard_count(&self) -> usize {
        Arc::strong_count(&self.usage) - 1
    }

    /// Whether a view or a guard holds this record.
    #[must_use]
    pub fn is_referenced(&self) -> bool {
        self.view_refs > 0 || self.guard_count() > 0
    }

    /// Whether the entry must stay resident.
    pub(crate) fn is_pinned(&self) -> bool {
        self.is_referenced() || !self.listener_data.is_empty() || self.state == EntryState::Requested
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("contact", &self.contact)
            .field("listeners", &self.listener_data.keys().collect::<Vec<_>>())
            .field("view_refs", &self.view_refs)
            .field("guards", &self.guard_count())
            .finish()
    }
}
