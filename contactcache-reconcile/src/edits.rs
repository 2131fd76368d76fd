//! A recording reconciliation agent.

use crate::list::{reconcile_complete, RangeOps};

/// One range operation emitted by a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit<T> {
    /// `items` were inserted at `index`.
    Insert { index: usize, items: Vec<T> },
    /// `count` elements were removed at `index`.
    Remove { index: usize, count: usize },
}

/// A [`RangeOps`] agent over a plain `Vec` that records every operation.
#[derive(Debug, Clone, Default)]
pub struct EditLog<T> {
    list: Vec<T>,
    edits: Vec<Edit<T>>,
}

impl<T: Clone> EditLog<T> {
    /// Creates a log over an initial cache list.
    pub fn new(list: Vec<T>) -> Self {
        Self {
            list,
            edits: Vec::new(),
        }
    }

    /// The cache list as edited so far.
    #[must_use]
    pub fn list(&self) -> &[T] {
        &self.list
    }

    /// The operations applied so far, in order.
    #[must_use]
    pub fn edits(&self) -> &[Edit<T>] {
        &self.edits
    }

    /// Consumes the log, returning the edited list and the operations.
    #[must_use]
    pub fn into_parts(self) -> (Vec<T>, Vec<Edit<T>>) {
        (self.list, self.edits)
    }
}

impl<T: Clone> RangeOps<T> for EditLog<T> {
    fn cache(&self) -> &[T] {
        &self.list
    }

    fn insert_range(&mut self, index: usize, count: usize, source: &[T], source_index: usize) -> usize {
        let items = &source[source_index..source_index + count];
        self.list.splice(index..index, items.iter().cloned());
        self.edits.push(Edit::Insert {
            index,
            items: items.to_vec(),
        });
        count
    }

    fn remove_range(&mut self, index: usize, count: usize) -> usize {
        self.list.drain(index..index + count);
        self.edits.push(Edit::Remove { index, count });
        count
    }
}

/// Returns the operations that turn `cache` into `reference`.
#[must_use]
pub fn diff<T: Clone + PartialEq>(cache: &[T], reference: &[T]) -> Vec<Edit<T>> {
    let mut log = EditLog::new(cache.to_vec());
    let (mut c, mut r) = (0, 0);
    reconcile_complete(&mut log, &mut c, reference, &mut r);
    log.edits
}
