//! Filtered-list reconciliation.
//!
//! A filtered view holds `[x for x in cache if predicate(x)]`. Rather than
//! recomputing it whenever the unfiltered cache changes, a
//! [`FilterProjector`] rides along with the unfiltered reconciliation and
//! translates each cache insert or remove into the matching filtered-view
//! operation:
//!
//! - inserted elements that pass the predicate are buffered, and the buffer
//!   is inserted into the view as one batch once the contiguous run ends;
//! - removed spans are scanned for elements currently in the view, and only
//!   those are removed, coalesced with adjacent removals;
//! - stretches of the cache the reconciler skipped over are only scanned
//!   when the next operation lands past them.
//!
//! The projector also handles a predicate change: elements whose membership
//! differs between [`FilteredRangeOps::is_filtered_in`] (the view as it is)
//! and [`FilteredRangeOps::filter_value`] (the view as it should be) are
//! removed or inserted as the scan passes over them.

use crate::list::{reconcile, reconcile_complete, RangeOps};

/// The filtered view a [`FilterProjector`] drives.
pub trait FilteredRangeOps<T> {
    /// Whether `item` belongs in the view.
    fn filter_value(&self, item: &T) -> bool;

    /// Whether `item` is in the view right now.
    ///
    /// Differs from [`filter_value`](Self::filter_value) only while the
    /// view's predicate is being replaced.
    fn is_filtered_in(&self, item: &T) -> bool {
        self.filter_value(item)
    }

    /// Inserts `items` into the view at `index`.
    fn insert_range(&mut self, index: usize, items: &[T]);

    /// Removes `count` view elements starting at `index`.
    fn remove_range(&mut self, index: usize, count: usize);
}

/// Translates unfiltered cache edits into filtered view edits.
///
/// Positions are tracked in two coordinate systems: `previous_index` is the
/// cache position up to which the view has been brought in line, and
/// `filtered_index` is the view position that corresponds to it once the
/// pending operations are flushed.
///
/// The projector may be kept across progressive reconciliations of the
/// same cache. Call [`reset`](Self::reset) whenever the cache or the view
/// is modified by anything other than the projector.
#[derive(Debug, Clone)]
pub struct FilterProjector<T> {
    previous_index: usize,
    filtered_index: usize,
    insert_index: usize,
    pending_insert: Vec<T>,
    remove_index: usize,
    remove_count: usize,
}

impl<T> Default for FilterProjector<T> {
    fn default() -> Self {
        Self {
            previous_index: 0,
            filtered_index: 0,
            insert_index: 0,
            pending_insert: Vec::new(),
            remove_index: 0,
            remove_count: 0,
        }
    }
}

impl<T: Clone> FilterProjector<T> {
    /// Creates a projector positioned at the start of the cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache position up to which the view has been reconciled.
    #[must_use]
    pub fn previous_index(&self) -> usize {
        self.previous_index
    }

    /// View position matching [`previous_index`](Self::previous_index).
    #[must_use]
    pub fn filtered_index(&self) -> usize {
        self.filtered_index
    }

    /// Whether operations are buffered and not yet applied to the view.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending_insert.is_empty() || self.remove_count > 0
    }

    /// Moves back to the start of the cache, dropping nothing: callers flush
    /// before resetting.
    pub fn reset(&mut self) {
        debug_assert!(!self.has_pending(), "reset with unflushed operations");
        self.previous_index = 0;
        self.filtered_index = 0;
    }

    /// Projects the insertion of `items` at cache position `index`.
    ///
    /// `cache` is the unfiltered list before the insertion is applied.
    pub fn insert<F>(&mut self, cache: &[T], index: usize, items: &[T], target: &mut F)
    where
        F: FilteredRangeOps<T> + ?Sized,
    {
        self.advance(cache, index, target);
        for item in items {
            if target.filter_value(item) {
                self.queue_insert(item.clone(), target);
            }
        }
        self.previous_index = index + items.len();
    }

    /// Projects the removal of `count` cache elements at `index`.
    ///
    /// `cache` is the unfiltered list before the removal is applied.
    pub fn remove<F>(&mut self, cache: &[T], index: usize, count: usize, target: &mut F)
    where
        F: FilteredRangeOps<T> + ?Sized,
    {
        self.advance(cache, index, target);
        let filtered_in = cache[index..index + count]
            .iter()
            .filter(|item| target.is_filtered_in(item))
            .count();
        if filtered_in > 0 {
            self.queue_remove(filtered_in, target);
        }
    }

    /// Applies every buffered operation to the view.
    pub fn finish<F>(&mut self, target: &mut F)
    where
        F: FilteredRangeOps<T> + ?Sized,
    {
        self.flush(target);
    }

    /// Scans the cache up to `index`, then applies every buffered operation.
    ///
    /// Needed when the predicate changed: elements the reconciler matched
    /// without touching may still have to enter or leave the view.
    pub fn finish_at<F>(&mut self, cache: &[T], index: usize, target: &mut F)
    where
        F: FilteredRangeOps<T> + ?Sized,
    {
        self.advance(cache, index, target);
        self.flush(target);
    }

    /// Runs a progressive reconciliation of `cache` against `reference`,
    /// keeping the view in line with the cache.
    ///
    /// On return the view reflects `filter_value` over `cache[..c]` and the
    /// view's previous membership over the rest.
    pub fn reconcile<F>(
        &mut self,
        cache: &mut Vec<T>,
        c: &mut usize,
        reference: &[T],
        r: &mut usize,
        target: &mut F,
    ) where
        T: PartialEq,
        F: FilteredRangeOps<T> + ?Sized,
    {
        let mut sync = FilteredSync {
            cache: &mut *cache,
            projector: &mut *self,
            target: &mut *target,
        };
        reconcile(&mut sync, c, reference, r);
        self.finish_at(cache, *c, target);
    }

    /// Runs a full reconciliation of `cache` against a complete `reference`.
    ///
    /// On return `cache == reference` and the view equals
    /// `[x for x in reference if filter_value(x)]`.
    pub fn reconcile_complete<F>(
        &mut self,
        cache: &mut Vec<T>,
        c: &mut usize,
        reference: &[T],
        r: &mut usize,
        target: &mut F,
    ) where
        T: PartialEq,
        F: FilteredRangeOps<T> + ?Sized,
    {
        let mut sync = FilteredSync {
            cache: &mut *cache,
            projector: &mut *self,
            target: &mut *target,
        };
        reconcile_complete(&mut sync, c, reference, r);
        self.finish_at(cache, cache.len(), target);
    }

    fn advance<F>(&mut self, cache: &[T], index: usize, target: &mut F)
    where
        F: FilteredRangeOps<T> + ?Sized,
    {
        if index < self.previous_index {
            debug_assert!(false, "filtered projection moved backwards");
            return;
        }

        for item in &cache[self.previous_index..index] {
            match (target.is_filtered_in(item), target.filter_value(item)) {
                (true, true) => {
                    // A kept element ends any contiguous run.
                    self.flush(target);
                    self.filtered_index += 1;
                }
                (true, false) => self.queue_remove(1, target),
                (false, true) => self.queue_insert(item.clone(), target),
                (false, false) => {}
            }
        }
        self.previous_index = index;
    }

    fn queue_insert<F>(&mut self, item: T, target: &mut F)
    where
        F: FilteredRangeOps<T> + ?Sized,
    {
        if !self.pending_insert.is_empty()
            && self.insert_index + self.pending_insert.len() != self.filtered_index
        {
            self.flush(target);
        }
        if self.pending_insert.is_empty() {
            self.insert_index = self.filtered_index;
        }
        self.pending_insert.push(item);
        self.filtered_index += 1;
    }

    fn queue_remove<F>(&mut self, count: usize, target: &mut F)
    where
        F: FilteredRangeOps<T> + ?Sized,
    {
        // Removals sit after any buffered insertion in the view, so the
        // insertion has to land first.
        if !self.pending_insert.is_empty()
            || (self.remove_count > 0 && self.remove_index != self.filtered_index)
        {
            self.flush(target);
        }
        if self.remove_count == 0 {
            self.remove_index = self.filtered_index;
        }
        self.remove_count += count;
    }

    fn flush<F>(&mut self, target: &mut F)
    where
        F: FilteredRangeOps<T> + ?Sized,
    {
        if self.remove_count > 0 {
            target.remove_range(self.remove_index, self.remove_count);
            self.remove_count = 0;
        }
        if !self.pending_insert.is_empty() {
            let items = std::mem::take(&mut self.pending_insert);
            target.insert_range(self.insert_index, &items);
        }
    }
}

/// Drives the unfiltered cache for the inner reconciler while projecting
/// every edit onto the filtered view.
struct FilteredSync<'a, T, F: ?Sized> {
    cache: &'a mut Vec<T>,
    projector: &'a mut FilterProjector<T>,
    target: &'a mut F,
}

impl<T, F> RangeOps<T> for FilteredSync<'_, T, F>
where
    T: Clone,
    F: FilteredRangeOps<T> + ?Sized,
{
    fn cache(&self) -> &[T] {
        self.cache.as_slice()
    }

    fn insert_range(&mut self, index: usize, count: usize, source: &[T], source_index: usize) -> usize {
        let items = &source[source_index..source_index + count];
        self.projector.insert(&self.cache[..], index, items, &mut *self.target);
        self.cache.splice(index..index, items.iter().cloned());
        count
    }

    fn remove_range(&mut self, index: usize, count: usize) -> usize {
        self.projector.remove(&self.cache[..], index, count, &mut *self.target);
        self.cache.drain(index..index + count);
        count
    }
}

/// Progressively reconciles an unfiltered `cache` against `reference`
/// while keeping `target` equal to the filtered cache.
///
/// See [`FilterProjector::reconcile`].
pub fn reconcile_filtered<T, F>(
    cache: &mut Vec<T>,
    c: &mut usize,
    reference: &[T],
    r: &mut usize,
    target: &mut F,
) where
    T: Clone + PartialEq,
    F: FilteredRangeOps<T> + ?Sized,
{
    FilterProjector::new().reconcile(cache, c, reference, r, target);
}

/// Fully reconciles an unfiltered `cache` against a complete `reference`
/// while keeping `target` equal to the filtered cache.
///
/// See [`FilterProjector::reconcile_complete`].
pub fn reconcile_filtered_complete<T, F>(
    cache: &mut Vec<T>,
    c: &mut usize,
    reference: &[T],
    r: &mut usize,
    target: &mut F,
) where
    T: Clone + PartialEq,
    F: FilteredRangeOps<T> + ?Sized,
{
    FilterProjector::new().reconcile_complete(cache, c, reference, r, target);
}
