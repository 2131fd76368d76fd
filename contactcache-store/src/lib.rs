//! Record store for ContactCache.
//!
//! Holds one [`CacheEntry`] per record handle and tracks:
//! - the fetch state of each record and a queue of pending fetches
//! - secondary indexes over normalized phone numbers and email addresses
//! - per-view listener data attached to entries
//! - who references an entry (view rows and [`RecordGuard`]s), so
//!   unreferenced entries can expire after a grace period

mod entry;
mod error;
mod guard;
mod store;

pub use entry::{CacheEntry, EntryState};
pub use error::{StoreError, StoreResult};
pub use guard::RecordGuard;
pub use store::{RecordStore, DEFAULT_EXPIRY_GRACE};
