//! In-memory backend for tests and demos.

use super::{ChangeNotification, ContactBackend, ContactStream, Query, QueryFilter};
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use contactcache_types::{BackendId, Contact, DisplayLabelOrder, ListKind, RecordHandle, SortOrder};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

#[derive(Default)]
struct MockState {
    contacts: BTreeMap<RecordHandle, Contact>,
    queries: Vec<Query>,
    saves: usize,
    removals: usize,
    fail_next: Option<String>,
    next_handle: u32,
    notifier: Option<mpsc::UnboundedSender<ChangeNotification>>,
}

impl MockState {
    fn notify(&self, notification: ChangeNotification) {
        if let Some(tx) = &self.notifier {
            let _ = tx.send(notification);
        }
    }

    fn take_failure(&mut self) -> BackendResult<()> {
        match self.fail_next.take() {
            Some(message) => Err(BackendError(message)),
            None => Ok(()),
        }
    }

    fn allocate(&mut self) -> BackendId {
        loop {
            self.next_handle += 1;
            if let Some(handle) = RecordHandle::new(self.next_handle)
                && !self.contacts.contains_key(&handle)
            {
                return BackendId::for_handle(handle);
            }
        }
    }
}

/// A contacts database held in memory.
///
/// Records are keyed by handle, so identifiers must carry a numeric
/// suffix. Every call is logged for inspection, and the next call can be
/// made to fail.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state();
            for contact in contacts {
                if let Some(handle) = contact.handle() {
                    state.contacts.insert(handle, contact);
                }
            }
        }
        backend
    }

    /// Sends a notification to `tx` for every later change.
    pub fn set_notifier(&self, tx: mpsc::UnboundedSender<ChangeNotification>) {
        self.state().notifier = Some(tx);
    }

    /// Adds or replaces a record as if another client had saved it.
    pub fn upsert(&self, contact: Contact) {
        let mut state = self.state();
        let Some(handle) = contact.handle() else {
            return;
        };
        let id = contact.id.clone();
        let notification = if state.contacts.insert(handle, contact).is_some() {
            ChangeNotification::Changed(vec![id])
        } else {
            ChangeNotification::Added(vec![id])
        };
        state.notify(notification);
    }

    /// Deletes a record as if another client had removed it.
    pub fn delete(&self, id: &BackendId) {
        let mut state = self.state();
        if let Some(handle) = id.handle()
            && state.contacts.remove(&handle).is_some()
        {
            state.notify(ChangeNotification::Removed(vec![id.clone()]));
        }
    }

    pub fn contact(&self, id: &BackendId) -> Option<Contact> {
        let handle = id.handle()?;
        self.state().contacts.get(&handle).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes the next backend call fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state().fail_next = Some(message.into());
    }

    /// Every query received so far.
    pub fn queries(&self) -> Vec<Query> {
        self.state().queries.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state().queries.len()
    }

    /// The identifier sets of every by-id query received so far.
    pub fn id_fetches(&self) -> Vec<Vec<BackendId>> {
        self.state()
            .queries
            .iter()
            .filter_map(|q| match &q.filter {
                QueryFilter::Ids(ids) => Some(ids.clone()),
                QueryFilter::List(_) => None,
            })
            .collect()
    }

    pub fn save_count(&self) -> usize {
        self.state().saves
    }

    pub fn removal_count(&self) -> usize {
        self.state().removals
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ContactBackend for MockBackend {
    async fn fetch(&self, query: Query) -> BackendResult<ContactStream> {
        let mut state = self.state();
        state.take_failure()?;
        state.queries.push(query.clone());

        let results: Vec<Contact> = match &query.filter {
            QueryFilter::List(list) => {
                let mut matching: Vec<&Contact> = state
                    .contacts
                    .values()
                    .filter(|c| in_list(c, *list))
                    .collect();
                matching.sort_by_cached_key(|c| sort_key(c, query.sort));
                matching.into_iter().cloned().collect()
            }
            QueryFilter::Ids(ids) => ids
                .iter()
                .filter_map(BackendId::handle)
                .filter_map(|h| state.contacts.get(&h).cloned())
                .collect(),
        };

        let pages: Vec<BackendResult<Vec<Contact>>> = results
            .chunks(query.page_size.max(1))
            .map(|page| Ok(page.to_vec()))
            .collect();
        Ok(stream::iter(pages).boxed())
    }

    async fn save(&self, contacts: Vec<Contact>) -> BackendResult<Vec<BackendId>> {
        let mut state = self.state();
        state.take_failure()?;
        state.saves += 1;

        let mut ids = Vec::with_capacity(contacts.len());
        let mut added = Vec::new();
        let mut changed = Vec::new();
        for mut contact in contacts {
            let handle = match contact.handle() {
                Some(handle) => handle,
                None => {
                    contact.id = state.allocate();
                    match contact.handle() {
                        Some(handle) => handle,
                        None => return Err(BackendError::new("identifier allocation failed")),
                    }
                }
            };
            let id = contact.id.clone();
            if state.contacts.insert(handle, contact).is_some() {
                changed.push(id.clone());
            } else {
                added.push(id.clone());
            }
            ids.push(id);
        }

        if !added.is_empty() {
            state.notify(ChangeNotification::Added(added));
        }
        if !changed.is_empty() {
            state.notify(ChangeNotification::Changed(changed));
        }
        Ok(ids)
    }

    async fn remove(&self, ids: Vec<BackendId>) -> BackendResult<()> {
        let mut state = self.state();
        state.take_failure()?;
        state.removals += 1;

        let removed: Vec<BackendId> = ids
            .into_iter()
            .filter(|id| {
                id.handle()
                    .is_some_and(|h| state.contacts.remove(&h).is_some())
            })
            .collect();
        if !removed.is_empty() {
            state.notify(ChangeNotification::Removed(removed));
        }
        Ok(())
    }
}

fn in_list(contact: &Contact, list: ListKind) -> bool {
    match list {
        ListKind::Favorites => contact.favorite,
        ListKind::All => true,
        ListKind::Online => contact.presence.is_online(),
    }
}

fn sort_key(contact: &Contact, sort: SortOrder) -> (String, String, Option<RecordHandle>) {
    let first = contact.first_name.to_lowercase();
    let last = contact.last_name.to_lowercase();
    let (primary, secondary) = match sort {
        SortOrder::FirstName => (first, last),
        SortOrder::LastName => (last, first),
        SortOrder::DisplayLabel => (
            contact.label(DisplayLabelOrder::FirstNameFirst).to_lowercase(),
            String::new(),
        ),
    };
    (primary, secondary, contact.handle())
}
