//! Structural notifications raised by views.

use contactcache_types::ViewId;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// A change to a view's rows.
///
/// Ranges are half-open `[begin, end)` in view coordinates. Every insert or
/// remove is announced twice: the `AboutTo*` event before the rows change,
/// the past-tense event after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    AboutToInsert { view: ViewId, begin: usize, end: usize },
    Inserted { view: ViewId, begin: usize, end: usize },
    AboutToRemove { view: ViewId, begin: usize, end: usize },
    Removed { view: ViewId, begin: usize, end: usize },
    /// The records in the range changed without moving.
    DataChanged { view: ViewId, begin: usize, end: usize },
    /// The view's first full backend query completed.
    Populated { view: ViewId },
}

impl ViewEvent {
    #[must_use]
    pub fn view(&self) -> ViewId {
        match self {
            Self::AboutToInsert { view, .. }
            | Self::Inserted { view, .. }
            | Self::AboutToRemove { view, .. }
            | Self::Removed { view, .. }
            | Self::DataChanged { view, .. }
            | Self::Populated { view } => *view,
        }
    }
}

/// Receives a view's notifications.
pub trait ViewSubscriber: Send {
    fn notify(&mut self, event: &ViewEvent);
}

/// Forwards notifications onto a channel, for subscribers on another task.
impl ViewSubscriber for mpsc::UnboundedSender<ViewEvent> {
    fn notify(&mut self, event: &ViewEvent) {
        // A closed receiver means the subscriber went away.
        let _ = self.send(event.clone());
    }
}

/// A subscriber that records every notification.
///
/// Clones share the same log, so one clone can be handed to a view while
/// another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<ViewEvent>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the events recorded so far.
    pub fn events(&self) -> Vec<ViewEvent> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Removes and returns the events recorded so far.
    pub fn take(&self) -> Vec<ViewEvent> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ViewSubscriber for EventLog {
    fn notify(&mut self, event: &ViewEvent) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
