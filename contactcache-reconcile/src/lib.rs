//! Ordered-list reconciliation for ContactCache.
//!
//! This crate turns one ordered list into another with a short script of
//! range inserts and removes, so that views over the list can announce
//! minimal structural changes instead of resetting:
//!
//! - [`reconcile`] / [`reconcile_complete`]: the list reconciler
//! - [`FilterProjector`]: projects unfiltered edits onto a filtered view
//! - [`reconcile_filtered`] / [`reconcile_filtered_complete`]: the
//!   reconciler driving a filtered view alongside its unfiltered cache
//! - [`EditLog`]: a recording agent for callers that want the edit script
//!
//! The reconciler is specialised for lists that share long common runs:
//! it finds the nearest point where the lists agree again rather than a
//! globally minimal script, and it tolerates a reference list that is still
//! being delivered page by page.
//!
//! # Example
//!
//! ```
//! use contactcache_reconcile::{diff, Edit};
//!
//! let edits = diff(&['A', 'B', 'C', 'D'], &['A', 'C', 'D', 'E']);
//! assert_eq!(
//!     edits,
//!     vec![
//!         Edit::Remove { index: 1, count: 1 },
//!         Edit::Insert { index: 3, items: vec!['E'] },
//!     ]
//! );
//! ```

mod edits;
mod filtered;
mod list;

pub use edits::{diff, Edit, EditLog};
pub use filtered::{reconcile_filtered, reconcile_filtered_complete, FilterProjector, FilteredRangeOps};
pub use list::{reconcile, reconcile_complete, RangeOps};
