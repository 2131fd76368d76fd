//! Coalescing of backend change notifications.

use std::time::Duration;
use tokio::time::Instant;

/// Decides when a burst of change notifications should be acted on.
///
/// Each notification pushes the deadline out by `window`, but never past
/// `max_wait` after the first notification of the burst.
#[derive(Debug, Clone)]
pub struct ChangeDebouncer {
    window: Duration,
    max_wait: Duration,
    first: Option<Instant>,
    deadline: Option<Instant>,
}

impl ChangeDebouncer {
    pub fn new(window: Duration, max_wait: Duration) -> Self {
        Self {
            window,
            max_wait: max_wait.max(window),
            first: None,
            deadline: None,
        }
    }

    /// Records a notification received at `now`.
    pub fn touch(&mut self, now: Instant) {
        let first = *self.first.get_or_insert(now);
        let deadline = (now + self.window).min(first + self.max_wait);
        self.deadline = Some(deadline);
    }

    /// When the pending burst is due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Forgets the current burst.
    pub fn reset(&mut self) {
        self.first = None;
        self.deadline = None;
    }
}
