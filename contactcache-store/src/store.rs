//! The record store.

use crate::entry::{CacheEntry, EntryState};
use crate::error::{StoreError, StoreResult};
use crate::guard::RecordGuard;
use contactcache_types::{Contact, KeyKind, RecordHandle, SecondaryKey, ViewId};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Default time an unreferenced entry stays resident.
pub const DEFAULT_EXPIRY_GRACE: Duration = Duration::from_secs(30);

/// Single authoritative store of cached records, keyed by handle.
///
/// Every view row refers to an entry here. Entries are created on demand,
/// filled in by fetch results and evicted once nothing has referenced them
/// for the configured grace period.
#[derive(Debug)]
pub struct RecordStore {
    entries: HashMap<RecordHandle, CacheEntry>,
    index: HashMap<SecondaryKey, BTreeSet<RecordHandle>>,
    requested: BTreeSet<RecordHandle>,
    /// Unreferenced entries awaiting expiry, with the time they were first
    /// seen unreferenced.
    candidates: BTreeMap<RecordHandle, Option<Instant>>,
    grace: Duration,
    release_tx: mpsc::UnboundedSender<RecordHandle>,
    release_rx: mpsc::UnboundedReceiver<RecordHandle>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_GRACE)
    }
}

impl RecordStore {
    /// Creates an empty store evicting unreferenced entries after `grace`.
    pub fn new(grace: Duration) -> Self {
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        Self {
            entries: HashMap::new(),
            index: HashMap::new(),
            requested: BTreeSet::new(),
            candidates: BTreeMap::new(),
            grace,
            release_tx,
            release_rx,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: RecordHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn entry(&self, handle: RecordHandle) -> Option<&CacheEntry> {
        self.entries.get(&handle)
    }

    /// Gets the entry for a handle, creating an `Absent` one if needed.
    ///
    /// A new entry is unreferenced and becomes an expiry candidate.
    pub fn get_or_create(&mut self, handle: RecordHandle) -> &mut CacheEntry {
        let candidates = &mut self.candidates;
        self.entries.entry(handle).or_insert_with(|| {
            candidates.insert(handle, None);
            CacheEntry::new(handle)
        })
    }

    pub fn lookup(&self, handle: RecordHandle) -> Option<&Contact> {
        self.entries.get(&handle).and_then(CacheEntry::contact)
    }

    /// Finds a record by phone number or email address.
    ///
    /// When several records share a key the lowest handle wins.
    pub fn lookup_by_secondary_key(&self, kind: KeyKind, raw: &str) -> Option<&Contact> {
        let key = SecondaryKey::new(kind, raw)?;
        self.index
            .get(&key)?
            .iter()
            .find_map(|handle| self.lookup(*handle))
    }

    // ── Fetch queue ─────────────────────────────────────────────────

    /// Queues an `Absent` record for the next batched fetch.
    ///
    /// Returns whether the handle was newly queued.
    pub fn request(&mut self, handle: RecordHandle) -> bool {
        let entry = self.get_or_create(handle);
        if entry.state != EntryState::Absent {
            return false;
        }
        entry.state = EntryState::Requested;
        self.requested.insert(handle)
    }

    /// Drains the fetch queue in handle order.
    ///
    /// The entries stay `Requested` until their result arrives or the
    /// request is cancelled.
    pub fn take_requested(&mut self) -> Vec<RecordHandle> {
        std::mem::take(&mut self.requested).into_iter().collect()
    }

    /// Puts a drained `Requested` entry back on the fetch queue.
    ///
    /// Returns whether the handle was queued again.
    pub fn requeue(&mut self, handle: RecordHandle) -> bool {
        match self.entries.get(&handle) {
            Some(entry) if entry.state == EntryState::Requested => self.requested.insert(handle),
            _ => false,
        }
    }

    /// Returns a `Requested` entry to `Absent`.
    pub fn cancel_request(&mut self, handle: RecordHandle) {
        self.requested.remove(&handle);
        if let Some(entry) = self.entries.get_mut(&handle)
            && entry.state == EntryState::Requested
        {
            entry.state = EntryState::Absent;
        }
    }

    // ── Fetch results ───────────────────────────────────────────────

    /// Stores a snapshot delivered by the backend.
    ///
    /// Listener data is cleared whenever any field changed. Returns whether
    /// the fields that define how the record renders changed.
    pub fn apply_result(&mut self, contact: Contact) -> StoreResult<bool> {
        let handle = contact
            .handle()
            .ok_or_else(|| StoreError::InvalidIdentifier(contact.id.to_string()))?;

        self.requested.remove(&handle);
        let entry = self.get_or_create(handle);

        let (changed, role_changed) = match &entry.contact {
            Some(old) => (*old != contact, old.role_fields_differ(&contact)),
            None => (true, true),
        };

        if changed {
            entry.listener_data.clear();
        }
        entry.state = match entry.state {
            EntryState::Complete if !changed => EntryState::Complete,
            _ => EntryState::Fetched,
        };

        let old_keys = std::mem::take(&mut entry.keys);
        let new_keys = secondary_keys(&contact);
        entry.keys = new_keys.clone();
        entry.contact = Some(contact);

        self.unindex(handle, &old_keys);
        for key in new_keys {
            self.index.entry(key).or_default().insert(handle);
        }

        trace!(%handle, changed, role_changed, "applied fetch result");
        Ok(role_changed)
    }

    /// Marks a fetched record as carrying every detail field.
    pub fn mark_complete(&mut self, handle: RecordHandle) -> StoreResult<()> {
        let entry = self
            .entries
            .get_mut(&handle)
            .ok_or(StoreError::NotFound(handle))?;
        if entry.state == EntryState::Fetched {
            entry.state = EntryState::Complete;
        }
        Ok(())
    }

    /// Records a backend deletion, dropping the snapshot and its keys.
    ///
    /// The entry itself stays until it expires so views can still be told
    /// about the removal. Returns the dropped snapshot.
    pub fn mark_removed(&mut self, handle: RecordHandle) -> Option<Contact> {
        self.requested.remove(&handle);
        let entry = self.entries.get_mut(&handle)?;
        entry.state = EntryState::Removed;
        entry.listener_data.clear();
        let keys = std::mem::take(&mut entry.keys);
        let contact = entry.contact.take();
        self.unindex(handle, &keys);
        debug!(%handle, "record removed by backend");
        contact
    }

    // ── Lifetime ────────────────────────────────────────────────────

    /// Hands out a guard keeping the record resident.
    ///
    /// Any pending expiry of the record is cancelled.
    pub fn acquire(&mut self, handle: RecordHandle) -> RecordGuard {
        let release = self.release_tx.clone();
        let entry = self.get_or_create(handle);
        let guard = RecordGuard::new(handle, entry.usage.clone(), release);
        self.candidates.remove(&handle);
        guard
    }

    /// Records that a view row now holds the record.
    pub fn add_view_ref(&mut self, handle: RecordHandle) {
        self.get_or_create(handle).view_refs += 1;
        self.candidates.remove(&handle);
    }

    /// Records that a view row no longer holds the record.
    ///
    /// Once no view holds it, its listener data is dropped and it becomes
    /// an expiry candidate.
    pub fn release_view_ref(&mut self, handle: RecordHandle) {
        let Some(entry) = self.entries.get_mut(&handle) else {
            debug_assert!(false, "view reference released for unknown record {handle}");
            return;
        };
        debug_assert!(entry.view_refs > 0, "unbalanced view reference for {handle}");
        entry.view_refs = entry.view_refs.saturating_sub(1);
        if entry.view_refs == 0 {
            entry.listener_data.clear();
            self.candidates.entry(handle).or_insert(None);
        }
    }

    /// Moves records whose guards were dropped onto the expiry list,
    /// stamping them with `now`.
    pub fn collect_released(&mut self, now: Instant) {
        while let Ok(handle) = self.release_rx.try_recv() {
            self.candidates.entry(handle).or_insert(None);
        }
        for since in self.candidates.values_mut() {
            since.get_or_insert(now);
        }
    }

    /// Evicts every candidate that has stayed unreferenced for the grace
    /// period. Returns the evicted handles.
    pub fn expire(&mut self, now: Instant) -> Vec<RecordHandle> {
        self.collect_released(now);

        let mut evicted = Vec::new();
        let mut retained = BTreeMap::new();
        for (handle, since) in std::mem::take(&mut self.candidates) {
            let Some(entry) = self.entries.get(&handle) else {
                continue;
            };
            if entry.is_referenced() {
                continue;
            }
            let since = since.unwrap_or(now);
            if entry.is_pinned() || now.saturating_duration_since(since) < self.grace {
                retained.insert(handle, Some(since));
                continue;
            }
            self.remove_entry(handle);
            evicted.push(handle);
        }
        self.candidates = retained;

        if !evicted.is_empty() {
            debug!(count = evicted.len(), "expired unreferenced records");
        }
        evicted
    }

    /// Evicts an entry immediately.
    ///
    /// Refused while a view, a guard, a listener or a pending fetch holds
    /// the entry.
    pub fn evict(&mut self, handle: RecordHandle) -> StoreResult<()> {
        let entry = self.entries.get(&handle).ok_or(StoreError::NotFound(handle))?;
        if entry.is_pinned() {
            return Err(StoreError::Pinned(handle));
        }
        self.remove_entry(handle);
        self.candidates.remove(&handle);
        Ok(())
    }

    // ── Listener data ───────────────────────────────────────────────

    /// Attaches view-private data to an entry, replacing any previous
    /// value for that view.
    pub fn set_listener_data<D: Any + Send + Sync>(
        &mut self,
        handle: RecordHandle,
        view: ViewId,
        data: D,
    ) -> StoreResult<()> {
        let entry = self
            .entries
            .get_mut(&handle)
            .ok_or(StoreError::NotFound(handle))?;
        entry.listener_data.insert(view, Box::new(data));
        Ok(())
    }

    /// The data a view attached to an entry, if present and of type `D`.
    pub fn listener_data<D: Any>(&self, handle: RecordHandle, view: ViewId) -> Option<&D> {
        self.entries
            .get(&handle)?
            .listener_data
            .get(&view)?
            .downcast_ref::<D>()
    }

    /// Drops everything a view attached to any entry.
    pub fn clear_listener_data(&mut self, view: ViewId) {
        for entry in self.entries.values_mut() {
            entry.listener_data.remove(&view);
        }
    }

    fn remove_entry(&mut self, handle: RecordHandle) {
        if let Some(entry) = self.entries.remove(&handle) {
            self.unindex(handle, &entry.keys);
            trace!(%handle, "evicted record");
        }
    }

    fn unindex(&mut self, handle: RecordHandle, keys: &[SecondaryKey]) {
        for key in keys {
            if let Some(handles) = self.index.get_mut(key) {
                handles.remove(&handle);
                if handles.is_empty() {
                    self.index.remove(key);
                }
            }
        }
    }
}

fn secondary_keys(contact: &Contact) -> Vec<SecondaryKey> {
    let phones = contact
        .phone_numbers
        .iter()
        .filter_map(|p| SecondaryKey::new(KeyKind::Phone, p));
    let emails = contact
        .emails
        .iter()
        .filter_map(|e| SecondaryKey::new(KeyKind::Email, e));
    let mut keys: Vec<SecondaryKey> = phones.chain(emails).collect();
    keys.dedup();
    keys
}
