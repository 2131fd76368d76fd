//! Source lists and the filtered views derived from them.
//!
//! A [`ListView`] mirrors one backend query. Each registered view is a
//! [`FilteredView`] of exactly one list; a view without a filter shows every
//! row of its list. Views are kept in line by projecting the list's edits
//! through a [`FilterProjector`] per view.

use crate::event::{ViewEvent, ViewSubscriber};
use crate::filter::ViewFilter;
use contactcache_reconcile::{FilterProjector, FilteredRangeOps, RangeOps};
use contactcache_store::RecordStore;
use contactcache_types::{RecordHandle, ViewId};
use std::collections::HashMap;

/// The unfiltered rows of one backend query, plus its views.
#[derive(Default)]
pub(crate) struct ListView {
    pub rows: Vec<RecordHandle>,
    pub populated: bool,
    /// Progressive reconciliation cursors into `rows` and the reference.
    pub c: usize,
    pub r: usize,
    pub views: Vec<FilteredView>,
}

impl ListView {
    pub fn view(&self, id: ViewId) -> Option<&FilteredView> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut FilteredView> {
        self.views.iter_mut().find(|v| v.id == id)
    }

    /// Restarts every view's projection at the top of the list.
    ///
    /// Needed after anything but a projector edits the rows.
    pub fn reset_projectors(&mut self) {
        for view in &mut self.views {
            view.projector.reset();
        }
    }

    /// Brings every view's projection up to `index` and applies whatever
    /// it still buffers.
    pub fn flush_projectors(&mut self, index: usize, store: &RecordStore) {
        for view in &mut self.views {
            let (projector, mut target) = view.split(store);
            projector.finish_at(&self.rows, index, &mut target);
        }
    }
}

/// One registered view.
pub(crate) struct FilteredView {
    pub id: ViewId,
    pub filter: Option<ViewFilter>,
    pub rows: Vec<RecordHandle>,
    /// Row count per handle. A move inside a reconciliation briefly shows
    /// a record twice.
    pub members: HashMap<RecordHandle, usize>,
    pub populated: bool,
    pub subscribers: Vec<Box<dyn ViewSubscriber>>,
    pub projector: FilterProjector<RecordHandle>,
}

impl FilteredView {
    pub fn new(id: ViewId, filter: Option<ViewFilter>, populated: bool) -> Self {
        Self {
            id,
            filter,
            rows: Vec::new(),
            members: HashMap::new(),
            populated,
            subscribers: Vec::new(),
            projector: FilterProjector::new(),
        }
    }

    /// Replaces the rows without raising notifications.
    pub fn reset_rows(&mut self, rows: Vec<RecordHandle>) {
        self.members.clear();
        for &handle in &rows {
            *self.members.entry(handle).or_default() += 1;
        }
        self.rows = rows;
    }

    pub fn emit(&mut self, event: ViewEvent) {
        for subscriber in &mut self.subscribers {
            subscriber.notify(&event);
        }
    }

    /// Caches whatever the filter needs to evaluate `handles` quickly.
    pub fn prime(&self, handles: &[RecordHandle], store: &mut RecordStore) {
        if let Some(filter) = &self.filter {
            filter.prime(handles, store, self.id);
        }
    }

    /// Whether the record belongs in the view under the current filter.
    pub fn accepts(&self, handle: RecordHandle, store: &RecordStore) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|filter| filter.matches(handle, store, self.id))
    }

    /// Splits the view into its projector and the target it drives.
    pub fn split<'a>(
        &'a mut self,
        store: &'a RecordStore,
    ) -> (&'a mut FilterProjector<RecordHandle>, ViewTarget<'a>) {
        let Self {
            id,
            filter,
            rows,
            members,
            subscribers,
            projector,
            ..
        } = self;
        let target = ViewTarget {
            id: *id,
            filter: filter.as_ref(),
            rows,
            members,
            subscribers,
            store,
        };
        (projector, target)
    }

    /// A target outside any projection, for edits the registry computes
    /// itself.
    pub fn target<'a>(&'a mut self, store: &'a RecordStore) -> ViewTarget<'a> {
        self.split(store).1
    }
}

/// A view's rows as seen by a [`FilterProjector`].
///
/// Membership before the edit comes from the view's member set. Copies of
/// a record are either all shown or all hidden, so a count per handle is
/// enough.
pub(crate) struct ViewTarget<'a> {
    id: ViewId,
    filter: Option<&'a ViewFilter>,
    rows: &'a mut Vec<RecordHandle>,
    members: &'a mut HashMap<RecordHandle, usize>,
    subscribers: &'a mut Vec<Box<dyn ViewSubscriber>>,
    store: &'a RecordStore,
}

impl ViewTarget<'_> {
    fn emit(&mut self, event: ViewEvent) {
        for subscriber in self.subscribers.iter_mut() {
            subscriber.notify(&event);
        }
    }
}

impl FilteredRangeOps<RecordHandle> for ViewTarget<'_> {
    fn filter_value(&self, item: &RecordHandle) -> bool {
        self.filter
            .is_none_or(|filter| filter.matches(*item, self.store, self.id))
    }

    fn is_filtered_in(&self, item: &RecordHandle) -> bool {
        self.members.contains_key(item)
    }

    fn insert_range(&mut self, index: usize, items: &[RecordHandle]) {
        let (view, begin, end) = (self.id, index, index + items.len());
        self.emit(ViewEvent::AboutToInsert { view, begin, end });
        self.rows.splice(index..index, items.iter().copied());
        for &handle in items {
            *self.members.entry(handle).or_default() += 1;
        }
        self.emit(ViewEvent::Inserted { view, begin, end });
    }

    fn remove_range(&mut self, index: usize, count: usize) {
        let (view, begin, end) = (self.id, index, index + count);
        self.emit(ViewEvent::AboutToRemove { view, begin, end });
        for handle in self.rows.drain(begin..end) {
            if let Some(count) = self.members.get_mut(&handle) {
                *count -= 1;
                if *count == 0 {
                    self.members.remove(&handle);
                }
            }
        }
        self.emit(ViewEvent::Removed { view, begin, end });
    }
}

/// Drives a list's rows for the reconciler, projecting every edit onto
/// the list's views and keeping the store's view references balanced.
pub(crate) struct ListSync<'a> {
    pub rows: &'a mut Vec<RecordHandle>,
    pub views: &'a mut [FilteredView],
    pub store: &'a mut RecordStore,
}

impl RangeOps<RecordHandle> for ListSync<'_> {
    fn cache(&self) -> &[RecordHandle] {
        self.rows.as_slice()
    }

    fn insert_range(
        &mut self,
        index: usize,
        count: usize,
        source: &[RecordHandle],
        source_index: usize,
    ) -> usize {
        let items = &source[source_index..source_index + count];
        for &handle in items {
            self.store.add_view_ref(handle);
        }
        for view in self.views.iter_mut() {
            view.prime(items, self.store);
            let (projector, mut target) = view.split(self.store);
            projector.insert(&self.rows[..], index, items, &mut target);
        }
        self.rows.splice(index..index, items.iter().copied());
        count
    }

    fn remove_range(&mut self, index: usize, count: usize) -> usize {
        for view in self.views.iter_mut() {
            let (projector, mut target) = view.split(self.store);
            projector.remove(&self.rows[..], index, count, &mut target);
        }
        for handle in self.rows.drain(index..index + count) {
            self.store.release_view_ref(handle);
        }
        count
    }
}
