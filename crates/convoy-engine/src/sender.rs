//! Cloneable producer handle onto the controller's event queue.

use std::sync::Arc;

use convoy_core::{Event, ScheduleError};

use crate::queue::EventQueue;

/// Thread-safe handle for scheduling events.
///
/// Obtained from [`Controller::sender()`](crate::Controller::sender) and
/// handed to every worker through its
/// [`StepContext`](crate::subsystem::StepContext). Clones share the
/// same queue.
#[derive(Clone)]
pub struct EventSender {
    queue: Arc<EventQueue<Event>>,
}

impl EventSender {
    pub(crate) fn new(queue: Arc<EventQueue<Event>>) -> Self {
        Self { queue }
    }

    /// Append `event` to the controller's queue.
    ///
    /// Never blocks beyond brief lock contention. Fails once the
    /// controller has processed `Close`, or when a bounded queue is full.
    pub fn schedule(&self, event: Event) -> Result<(), ScheduleError> {
        self.queue.push(event).map_err(ScheduleError::from)
    }

    /// Whether the controller has stopped accepting events.
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Events waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl std::fmt::Debug for EventSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSender")
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}
