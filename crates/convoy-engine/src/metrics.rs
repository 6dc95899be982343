//! Dispatch counters collected by the controller.
//!
//! [`ControllerMetrics`] is plain data, updated on the controller thread
//! after each dispatch and read through
//! [`Controller::metrics()`](crate::Controller::metrics) or the final
//! [`RunReport`](crate::RunReport).

use convoy_core::{Event, Transition};

/// Counters for events seen by the controller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerMetrics {
    /// Events dequeued and dispatched, ignored ones included.
    pub events_dispatched: u64,
    /// Dispatched events that were ignored in the current state.
    pub events_ignored: u64,
    /// Dispatched events by kind, indexed by [`Event::index()`].
    pub by_kind: [u64; Event::COUNT],
    /// Dispatches that moved the machine to a different state.
    pub state_changes: u64,
    /// Events still queued when the run closed. Never dispatched.
    pub events_discarded: u64,
}

impl ControllerMetrics {
    /// Count one dispatched transition.
    pub fn record(&mut self, t: &Transition) {
        self.events_dispatched += 1;
        self.by_kind[t.event.index()] += 1;
        if t.is_ignored() {
            self.events_ignored += 1;
        }
        if t.from != t.to {
            self.state_changes += 1;
        }
    }

    /// Dispatched events of one kind.
    pub fn count(&self, event: Event) -> u64 {
        self.by_kind[event.index()]
    }
}
