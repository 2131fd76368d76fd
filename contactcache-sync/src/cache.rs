//! The cache composition root.

use crate::backend::ChangeNotification;
use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::pending::PendingChangeSet;
use contactcache_store::{RecordGuard, RecordStore};
use contactcache_types::{Contact, KeyKind, ListKind, RecordHandle, SortOrder, ViewId};
use contactcache_view::{ViewFilter, ViewRegistry, ViewSubscriber};
use std::any::Any;
use std::collections::BTreeMap;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Snapshots taken before an optimistic local edit, for rollback.
pub(crate) type Snapshot = Vec<(RecordHandle, Option<Contact>)>;

/// The contacts cache: one record store, the lists and views built over
/// it, and the changes waiting to be fetched.
///
/// Owned by a single task and mutated through `&mut`. The
/// [`FetchOrchestrator`](crate::FetchOrchestrator) feeds it backend
/// results; the presentation layer reads rows and records from it.
pub struct Cache {
    config: CacheConfig,
    store: RecordStore,
    registry: ViewRegistry,
    pending: PendingChangeSet,
    /// Query results delivered so far in each list's current pass.
    references: BTreeMap<ListKind, Vec<RecordHandle>>,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Self {
        let store = RecordStore::new(config.expiry_grace());
        Self {
            config,
            store,
            registry: ViewRegistry::new(),
            pending: PendingChangeSet::new(),
            references: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    // ── Views ───────────────────────────────────────────────────────

    pub fn register_view(&mut self, list: ListKind, filter: Option<ViewFilter>) -> ViewId {
        self.registry.register_view(list, filter, &mut self.store)
    }

    pub fn unregister_view(&mut self, id: ViewId) -> CacheResult<()> {
        Ok(self.registry.unregister_view(id, &mut self.store)?)
    }

    pub fn subscribe(&mut self, id: ViewId, subscriber: Box<dyn ViewSubscriber>) -> CacheResult<()> {
        Ok(self.registry.subscribe(id, subscriber)?)
    }

    pub fn rows(&self, id: ViewId) -> CacheResult<&[RecordHandle]> {
        Ok(self.registry.rows(id)?)
    }

    pub fn is_populated(&self, id: ViewId) -> CacheResult<bool> {
        Ok(self.registry.is_populated(id)?)
    }

    pub fn set_filter(&mut self, id: ViewId, filter: Option<ViewFilter>) -> CacheResult<()> {
        Ok(self.registry.set_filter(id, filter, &mut self.store)?)
    }

    // ── Records ─────────────────────────────────────────────────────

    pub fn lookup(&self, handle: RecordHandle) -> Option<&Contact> {
        self.store.lookup(handle)
    }

    pub fn lookup_by_secondary_key(&self, kind: KeyKind, raw: &str) -> Option<&Contact> {
        self.store.lookup_by_secondary_key(kind, raw)
    }

    /// The label a row shows for a record, in the configured name order.
    pub fn display_label(&self, handle: RecordHandle) -> Option<String> {
        self.lookup(handle)
            .map(|contact| contact.label(self.config.display_label_order))
    }

    /// Keeps a record resident for as long as the guard lives.
    pub fn acquire(&mut self, handle: RecordHandle) -> RecordGuard {
        self.store.acquire(handle)
    }

    /// Asks for a record to be fetched with the next batch of changes.
    pub fn request(&mut self, handle: RecordHandle) -> bool {
        self.store.request(handle)
    }

    pub fn set_listener_data<D: Any + Send + Sync>(
        &mut self,
        handle: RecordHandle,
        view: ViewId,
        data: D,
    ) -> CacheResult<()> {
        Ok(self.store.set_listener_data(handle, view, data)?)
    }

    pub fn listener_data<D: Any>(&self, handle: RecordHandle, view: ViewId) -> Option<&D> {
        self.store.listener_data(handle, view)
    }

    /// Evicts records left unreferenced for the grace period.
    pub fn expire(&mut self, now: Instant) -> Vec<RecordHandle> {
        self.store.expire(now)
    }

    // ── Fetch pipeline ──────────────────────────────────────────────

    /// Starts a new pass of `list` against a fresh query.
    pub fn begin_list(&mut self, list: ListKind) {
        self.references.insert(list, Vec::new());
        self.registry.begin_sync(list);
    }

    /// Stores one page of a list query and reconciles the list against
    /// everything delivered so far.
    pub fn apply_list_batch(&mut self, list: ListKind, contacts: Vec<Contact>) -> CacheResult<()> {
        let mut delivered = Vec::with_capacity(contacts.len());
        for contact in contacts {
            if let Some(handle) = self.apply_record(contact)? {
                delivered.push(handle);
            }
        }

        let reference = self.references.entry(list).or_default();
        reference.extend(delivered);
        self.registry.sync_list(list, reference, &mut self.store);
        trace!(%list, delivered = reference.len(), "applied list batch");
        Ok(())
    }

    /// Completes the pass of `list`, dropping rows the query no longer
    /// returns.
    pub fn finish_list(&mut self, list: ListKind) {
        let reference = self.references.entry(list).or_default();
        self.registry.finish_sync(list, reference, &mut self.store);
        info!(%list, rows = reference.len(), "list synchronised");
    }

    /// Stores records fetched by identifier.
    ///
    /// Returns whether any change can move a record within or between
    /// lists, in which case the lists need to be queried again.
    pub fn apply_updates(&mut self, contacts: Vec<Contact>) -> CacheResult<bool> {
        let mut reorder = false;
        for contact in contacts {
            let previous = contact.handle().and_then(|h| self.store.lookup(h)).cloned();
            if let Some(old) = &previous {
                reorder |= affects_lists(old, &contact);
            }
            if let Some(handle) = self.apply_record(contact)? {
                self.store.mark_complete(handle)?;
            }
        }
        Ok(reorder)
    }

    /// Drops records deleted by the backend from every list and view.
    pub fn remove_records(&mut self, handles: &[RecordHandle]) {
        for &handle in handles {
            self.registry.remove_record(handle, &mut self.store);
            self.store.mark_removed(handle);
            for reference in self.references.values_mut() {
                reference.retain(|h| *h != handle);
            }
        }
        if !handles.is_empty() {
            debug!(count = handles.len(), "removed records");
        }
    }

    pub fn record_notification(&mut self, notification: ChangeNotification) {
        self.pending.record(notification);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn take_pending(&mut self) -> PendingChangeSet {
        self.pending.take()
    }

    pub(crate) fn restore_pending(&mut self, changes: PendingChangeSet) {
        self.pending.restore(changes);
    }

    pub(crate) fn requeue(&mut self, handle: RecordHandle) -> bool {
        self.store.requeue(handle)
    }

    pub(crate) fn take_requested(&mut self) -> Vec<RecordHandle> {
        self.store.take_requested()
    }

    pub(crate) fn cancel_request(&mut self, handle: RecordHandle) {
        self.store.cancel_request(handle);
    }

    pub(crate) fn set_sort_order(&mut self, order: SortOrder) {
        self.config.sort_order = order;
    }

    // ── Local edits ─────────────────────────────────────────────────

    /// Applies edits ahead of the backend confirming them.
    pub(crate) fn apply_local(&mut self, contacts: &[Contact]) -> CacheResult<Snapshot> {
        let mut snapshot = Vec::new();
        for contact in contacts {
            let Some(handle) = contact.handle() else {
                continue;
            };
            snapshot.push((handle, self.store.lookup(handle).cloned()));
            self.apply_record(contact.clone())?;
        }
        Ok(snapshot)
    }

    /// Undoes [`apply_local`](Self::apply_local).
    pub(crate) fn rollback(&mut self, snapshot: Snapshot) -> CacheResult<()> {
        for (handle, previous) in snapshot.into_iter().rev() {
            match previous {
                Some(contact) => {
                    self.apply_record(contact)?;
                }
                None => {
                    self.registry.remove_record(handle, &mut self.store);
                    self.store.mark_removed(handle);
                }
            }
        }
        Ok(())
    }

    /// Stores a snapshot and tells the views when a record they may show
    /// changed. Returns `None` for records with malformed identifiers.
    fn apply_record(&mut self, contact: Contact) -> CacheResult<Option<RecordHandle>> {
        let Some(handle) = contact.handle() else {
            warn!(id = %contact.id, "skipping record with malformed identifier");
            return Ok(None);
        };
        let changed = self
            .store
            .lookup(handle)
            .is_some_and(|old| *old != contact);
        self.store.apply_result(contact)?;
        if changed {
            self.registry.record_changed(handle, &mut self.store);
        }
        Ok(Some(handle))
    }
}

/// Whether an update can change which lists hold a record, or where.
fn affects_lists(old: &Contact, new: &Contact) -> bool {
    old.role_fields_differ(new)
        || old.favorite != new.favorite
        || old.presence.is_online() != new.presence.is_online()
}
