//! The list reconciler.
//!
//! Walks a cache list and a reference list in lock-step. Where they diverge
//! it widens a search window one element at a time over both lists until
//! some cache element reappears in the reference or some reference element
//! reappears in the cache, then resolves the span before that point with
//! one remove and one insert.
//!
//! Cost is bounded by the square of the divergent span, not by the list
//! lengths, which suits lists that differ by a handful of moved, added or
//! removed records.

/// The agent a reconciliation drives.
///
/// The agent owns the cache list and applies each range operation to it
/// before returning; the reconciler re-reads the cache through
/// [`RangeOps::cache`] after every call.
pub trait RangeOps<T> {
    /// The list being brought in line with the reference.
    fn cache(&self) -> &[T];

    /// Inserts `source[source_index..source_index + count]` into the cache
    /// at `index`.
    ///
    /// Returns how many elements now occupy the cache at `index`.
    fn insert_range(&mut self, index: usize, count: usize, source: &[T], source_index: usize)
        -> usize;

    /// Removes `count` cache elements starting at `index`.
    ///
    /// Returns how many were actually taken out of the cache.
    fn remove_range(&mut self, index: usize, count: usize) -> usize;
}

/// Where the lists agree again after a divergence at `(c, r)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    /// `cache[c + skip] == reference[r + count]`.
    Cache { skip: usize, count: usize },
    /// `reference[r + skip] == cache[c + count]`.
    Reference { skip: usize, count: usize },
}

/// Reconciles the cache held by `ops` against `reference`, starting at the
/// cursors `c` (cache) and `r` (reference).
///
/// On return the cursors sit just past the last position where both lists
/// agree. Elements past the cursors are left untouched: either one list ran
/// out, or no element past the divergence appears in both lists. Once the
/// reference is known to be complete, finish with [`reconcile_complete`] or
/// resolve the tails yourself.
///
/// Calling again with the same cursors after `reference` has grown
/// continues where the previous call stopped; consumed prefixes are never
/// revisited.
///
/// Both lists must be free of duplicates.
pub fn reconcile<T, O>(ops: &mut O, c: &mut usize, reference: &[T], r: &mut usize)
where
    T: PartialEq,
    O: RangeOps<T> + ?Sized,
{
    loop {
        let cache = ops.cache();
        if *c >= cache.len() || *r >= reference.len() {
            return;
        }

        if cache[*c] == reference[*r] {
            *c += 1;
            *r += 1;
            continue;
        }

        let Some(found) = find_match(cache, *c, reference, *r) else {
            return;
        };
        apply_match(ops, c, reference, r, found);

        debug_assert!(
            ops.cache().get(*c - 1) == reference.get(*r - 1),
            "reconciled position does not agree with the reference"
        );
    }
}

/// Reconciles as [`reconcile`], then removes whatever is left of the cache
/// past `c` and appends whatever is left of the reference past `r`.
///
/// Use this once the reference list is complete. On return the cache
/// equals the reference and both cursors sit at its end.
pub fn reconcile_complete<T, O>(ops: &mut O, c: &mut usize, reference: &[T], r: &mut usize)
where
    T: PartialEq,
    O: RangeOps<T> + ?Sized,
{
    reconcile(ops, c, reference, r);

    let cache_len = ops.cache().len();
    if *c < cache_len {
        let stale = cache_len - *c;
        let removed = ops.remove_range(*c, stale);
        *c += stale - removed;
    }

    if *r < reference.len() {
        let count = reference.len() - *r;
        *c += ops.insert_range(*c, count, reference, *r);
        *r = reference.len();
    }
}

/// Searches for the nearest point past a divergence where the lists agree.
fn find_match<T: PartialEq>(cache: &[T], c: usize, reference: &[T], r: usize) -> Option<Match> {
    let mut count = 1;

    while c + count < cache.len() && r + count < reference.len() {
        let cache_item = &cache[c + count];
        let reference_item = &reference[r + count];

        for skip in 0..=count {
            if cache[c + skip] == *reference_item {
                return Some(Match::Cache { skip, count });
            }
            if reference[r + skip] == *cache_item {
                return Some(Match::Reference { skip, count });
            }
        }

        count += 1;
    }

    // The cache ran out first: keep walking the reference.
    for re in (r + count)..reference.len() {
        for skip in 0..count {
            if cache[c + skip] == reference[re] {
                return Some(Match::Cache { skip, count: re - r });
            }
        }
    }

    // The reference ran out first: keep walking the cache.
    for ce in (c + count)..cache.len() {
        for skip in 0..count {
            if reference[r + skip] == cache[ce] {
                return Some(Match::Reference { skip, count: ce - c });
            }
        }
    }

    None
}

/// Resolves the divergent span before a match and steps past the match.
fn apply_match<T, O>(ops: &mut O, c: &mut usize, reference: &[T], r: &mut usize, found: Match)
where
    O: RangeOps<T> + ?Sized,
{
    match found {
        Match::Cache { skip, count } => {
            // cache[c..c + skip] has no counterpart; reference[r..r + count] is new.
            if skip > 0 {
                let removed = ops.remove_range(*c, skip);
                *c += skip - removed;
            }
            *c += ops.insert_range(*c, count, reference, *r);
            *c += 1;
            *r += count + 1;
        }
        Match::Reference { skip, count } => {
            // cache[c..c + count] has no counterpart; reference[r..r + skip] is new.
            let removed = ops.remove_range(*c, count);
            *c += count - removed;
            if skip > 0 {
                *c += ops.insert_range(*c, skip, reference, *r);
            }
            *c += 1;
            *r += skip + 1;
        }
    }
}
