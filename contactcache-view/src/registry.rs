//! The view registry.

use crate::error::{ViewError, ViewResult};
use crate::event::{ViewEvent, ViewSubscriber};
use crate::filter::ViewFilter;
use crate::list::{FilteredView, ListSync, ListView};
use contactcache_reconcile::{reconcile, reconcile_complete, FilteredRangeOps};
use contactcache_store::RecordStore;
use contactcache_types::{ListKind, RecordHandle, ViewId};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Owns every source list and the views registered on them.
///
/// Lists follow the backend's ordered query results through progressive
/// reconciliation; views follow their list through per-view filter
/// projection and report every structural change to their subscribers.
#[derive(Default)]
pub struct ViewRegistry {
    lists: BTreeMap<ListKind, ListView>,
    owners: HashMap<ViewId, ListKind>,
    next_id: u32,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ────────────────────────────────────────────────

    /// Registers a view over `list`, showing the rows that pass `filter`.
    ///
    /// The view starts out with the list's current rows and is populated
    /// if the list is. No notifications are raised for the initial rows.
    pub fn register_view(
        &mut self,
        list: ListKind,
        filter: Option<ViewFilter>,
        store: &mut RecordStore,
    ) -> ViewId {
        self.next_id += 1;
        let id = ViewId::new(self.next_id);
        let source = self.lists.entry(list).or_default();

        let mut view = FilteredView::new(id, filter, source.populated);
        view.prime(&source.rows, store);
        let rows: Vec<RecordHandle> = source
            .rows
            .iter()
            .copied()
            .filter(|h| view.accepts(*h, store))
            .collect();
        view.reset_rows(rows);

        debug!(%id, %list, rows = view.rows.len(), "registered view");
        source.views.push(view);
        self.owners.insert(id, list);
        id
    }

    /// Drops a view and everything it attached to cache entries.
    pub fn unregister_view(&mut self, id: ViewId, store: &mut RecordStore) -> ViewResult<()> {
        let list = self.owners.remove(&id).ok_or(ViewError::UnknownView(id))?;
        if let Some(source) = self.lists.get_mut(&list) {
            source.views.retain(|v| v.id != id);
        }
        store.clear_listener_data(id);
        debug!(%id, %list, "unregistered view");
        Ok(())
    }

    pub fn subscribe(&mut self, id: ViewId, subscriber: Box<dyn ViewSubscriber>) -> ViewResult<()> {
        self.view_mut(id)?.subscribers.push(subscriber);
        Ok(())
    }

    pub fn rows(&self, id: ViewId) -> ViewResult<&[RecordHandle]> {
        Ok(&self.view(id)?.rows)
    }

    pub fn is_populated(&self, id: ViewId) -> ViewResult<bool> {
        Ok(self.view(id)?.populated)
    }

    pub fn filter(&self, id: ViewId) -> ViewResult<Option<&ViewFilter>> {
        Ok(self.view(id)?.filter.as_ref())
    }

    /// The list a view was registered on.
    pub fn list_of(&self, id: ViewId) -> ViewResult<ListKind> {
        self.owners.get(&id).copied().ok_or(ViewError::UnknownView(id))
    }

    /// The unfiltered rows of a list.
    pub fn list_rows(&self, list: ListKind) -> &[RecordHandle] {
        self.lists
            .get(&list)
            .map(|source| source.rows.as_slice())
            .unwrap_or_default()
    }

    pub fn is_list_populated(&self, list: ListKind) -> bool {
        self.lists.get(&list).is_some_and(|source| source.populated)
    }

    // ── Synchronisation with backend queries ────────────────────────

    /// Starts a new pass of `list` against a fresh query result.
    pub fn begin_sync(&mut self, list: ListKind) {
        let source = self.lists.entry(list).or_default();
        source.c = 0;
        source.r = 0;
        source.reset_projectors();
        trace!(%list, "begin sync");
    }

    /// Reconciles `list` against the prefix of the query result delivered
    /// so far. Rows past the last agreeing position are left in place,
    /// unless none are left, in which case the rest of the delivery is
    /// appended.
    pub fn sync_list(&mut self, list: ListKind, reference: &[RecordHandle], store: &mut RecordStore) {
        let source = self.lists.entry(list).or_default();
        let ListView { rows, views, c, r, .. } = source;
        let mut sync = ListSync {
            rows,
            views,
            store: &mut *store,
        };
        reconcile(&mut sync, c, reference, r);
        if *c >= sync.rows.len() {
            reconcile_complete(&mut sync, c, reference, r);
        }

        let c = source.c;
        source.flush_projectors(c, store);
        trace!(%list, c, r = source.r, "synced delivered prefix");
    }

    /// Reconciles `list` against the complete query result and marks the
    /// list and its views populated.
    pub fn finish_sync(&mut self, list: ListKind, reference: &[RecordHandle], store: &mut RecordStore) {
        let source = self.lists.entry(list).or_default();
        let ListView { rows, views, c, r, .. } = source;
        let mut sync = ListSync {
            rows,
            views,
            store: &mut *store,
        };
        reconcile_complete(&mut sync, c, reference, r);

        let end = source.rows.len();
        source.flush_projectors(end, store);
        source.populated = true;
        for view in &mut source.views {
            if !view.populated {
                view.populated = true;
                let id = view.id;
                view.emit(ViewEvent::Populated { view: id });
            }
        }
        debug!(%list, rows = end, "list populated");
    }

    // ── Filters ─────────────────────────────────────────────────────

    /// Replaces a view's filter, emitting the minimal set of row changes.
    ///
    /// - a filter that can only drop rows (any first filter, or one that
    ///   narrows the previous one): one pass over the view removes the
    ///   rows that no longer match
    /// - anything else: one pass over the list, position by position
    ///
    /// Both passes work by position, so they stay exact in the middle of a
    /// progressive pass, while the list briefly holds a moved record twice.
    pub fn set_filter(
        &mut self,
        id: ViewId,
        filter: Option<ViewFilter>,
        store: &mut RecordStore,
    ) -> ViewResult<()> {
        let list = self.list_of(id)?;
        let source = self.lists.entry(list).or_default();
        let Some(view) = source.views.iter_mut().find(|v| v.id == id) else {
            return Err(ViewError::UnknownView(id));
        };

        let previous = std::mem::replace(&mut view.filter, filter);
        // Tokens cached for the previous search are still valid: they
        // describe the record, not the query.
        view.prime(&source.rows, store);

        let update = match (&previous, &view.filter) {
            (None, None) => return Ok(()),
            (None, Some(_)) => FilterUpdate::Refinement,
            (Some(old), Some(new)) if new.refines(old) => FilterUpdate::Refinement,
            _ => FilterUpdate::General,
        };
        debug!(%id, ?update, "filter changed");

        match update {
            FilterUpdate::Refinement => refinement_scan(view, store),
            FilterUpdate::General => {
                rescan(view, &source.rows, store, None);
            }
        }
        source.reset_projectors();
        Ok(())
    }

    // ── Record changes ──────────────────────────────────────────────

    /// Reports that a record's data changed in the store.
    ///
    /// Views that keep showing the record get `DataChanged`; views whose
    /// filter now admits or rejects it get an insert or a remove. Every
    /// row holding the record is updated.
    pub fn record_changed(&mut self, handle: RecordHandle, store: &mut RecordStore) {
        for source in self.lists.values_mut() {
            if !source.rows.contains(&handle) {
                continue;
            }
            for view in &mut source.views {
                view.prime(&[handle], store);
                let kept = rescan(view, &source.rows, store, Some(handle));
                let id = view.id;
                for index in kept {
                    view.emit(ViewEvent::DataChanged {
                        view: id,
                        begin: index,
                        end: index + 1,
                    });
                }
            }
            source.reset_projectors();
        }
    }

    /// Removes a record from every list and view.
    ///
    /// A list in the middle of a progressive pass restarts it from the
    /// top on its next delivery.
    pub fn remove_record(&mut self, handle: RecordHandle, store: &mut RecordStore) {
        for (list, source) in self.lists.iter_mut() {
            if !source.rows.contains(&handle) {
                continue;
            }
            source.reset_projectors();
            while let Some(index) = source.rows.iter().position(|h| *h == handle) {
                for view in &mut source.views {
                    let (projector, mut target) = view.split(store);
                    projector.remove(&source.rows, index, 1, &mut target);
                    projector.finish(&mut target);
                    projector.reset();
                }
                source.rows.remove(index);
                store.release_view_ref(handle);
            }
            source.c = 0;
            source.r = 0;
            trace!(%list, %handle, "removed record");
        }
    }

    fn view(&self, id: ViewId) -> ViewResult<&FilteredView> {
        self.owners
            .get(&id)
            .and_then(|list| self.lists.get(list))
            .and_then(|source| source.view(id))
            .ok_or(ViewError::UnknownView(id))
    }

    fn view_mut(&mut self, id: ViewId) -> ViewResult<&mut FilteredView> {
        let list = self.list_of(id)?;
        self.lists
            .get_mut(&list)
            .and_then(|source| source.view_mut(id))
            .ok_or(ViewError::UnknownView(id))
    }
}

/// How a filter replacement is carried out.
#[derive(Debug, Clone, Copy)]
enum FilterUpdate {
    Refinement,
    General,
}

/// Marks which list positions the view shows.
///
/// A view holds its list's rows in list order, so they are matched
/// greedily. Copies of a record are either all shown or all hidden.
fn shown_positions(view: &[RecordHandle], parent: &[RecordHandle]) -> Vec<bool> {
    let mut next = view.iter().peekable();
    let shown: Vec<bool> = parent
        .iter()
        .map(|handle| next.next_if(|h| *h == handle).is_some())
        .collect();
    debug_assert!(next.peek().is_none(), "view rows missing from their list");
    shown
}

/// Brings a view in line with its list position by position, re-checking
/// every row, or only the rows holding `changed`.
///
/// Consecutive changes of the same kind go out as one range. Returns the
/// view positions of re-checked rows that stayed in the view.
fn rescan(
    view: &mut FilteredView,
    parent: &[RecordHandle],
    store: &RecordStore,
    changed: Option<RecordHandle>,
) -> Vec<usize> {
    let shown = shown_positions(&view.rows, parent);
    let checked: Vec<bool> = parent
        .iter()
        .map(|h| changed.is_none_or(|changed| changed == *h))
        .collect();
    let wanted: Vec<bool> = parent
        .iter()
        .zip(&checked)
        .zip(&shown)
        .map(|((h, checked), shown)| if *checked { view.accepts(*h, store) } else { *shown })
        .collect();

    let mut kept = Vec::new();
    let mut target = view.target(store);
    let mut index = 0;
    let mut i = 0;
    while i < parent.len() {
        let start = i;
        match (shown[i], wanted[i]) {
            (true, true) => {
                if checked[i] {
                    kept.push(index);
                }
                index += 1;
                i += 1;
            }
            (false, false) => i += 1,
            (true, false) => {
                while i < parent.len() && shown[i] && !wanted[i] {
                    i += 1;
                }
                target.remove_range(index, i - start);
            }
            (false, true) => {
                while i < parent.len() && !shown[i] && wanted[i] {
                    i += 1;
                }
                target.insert_range(index, &parent[start..i]);
                index += i - start;
            }
        }
    }
    kept
}

/// Drops the rows a narrower filter rejects, one run at a time.
fn refinement_scan(view: &mut FilteredView, store: &RecordStore) {
    let keep: Vec<bool> = view.rows.iter().map(|h| view.accepts(*h, store)).collect();
    let mut target = view.target(store);
    let mut removed = 0;
    let mut i = 0;
    while i < keep.len() {
        if keep[i] {
            i += 1;
            continue;
        }
        let start = i;
        while i < keep.len() && !keep[i] {
            i += 1;
        }
        target.remove_range(start - removed, i - start);
        removed += i - start;
    }
}
