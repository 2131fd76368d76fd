//! RAII usage guards.

use contactcache_types::RecordHandle;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Keeps a record resident while held.
///
/// Dropping the guard reports the handle to the store, which starts the
/// expiry grace period once nothing else references the record.
#[derive(Debug)]
pub struct RecordGuard {
    handle: RecordHandle,
    _usage: Arc<()>,
    release: mpsc::UnboundedSender<RecordHandle>,
}

impl RecordGuard {
    pub(crate) fn new(
        handle: RecordHandle,
        usage: Arc<()>,
        release: mpsc::UnboundedSender<RecordHandle>,
    ) -> Self {
        Self {
            handle,
            _usage: usage,
            release,
        }
    }

    #[must_use]
    pub fn handle(&self) -> RecordHandle {
        self.handle
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        // The store may already be gone.
        let _ = self.release.send(self.handle);
    }
}
