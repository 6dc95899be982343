//! Worker roles managed by the thread orchestrator.

use std::fmt;

/// Which of the three worker threads a subsystem runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Simulation state.
    Model,
    /// Rendering of Model state.
    View,
    /// Periodic event producer.
    Timer,
}

impl Role {
    /// Order in which threads are spawned. The Timer goes last so the
    /// first ticks it produces find the Model and View already running.
    pub const START_ORDER: [Role; 3] = [Role::Model, Role::View, Role::Timer];

    /// Order in which threads are stopped and joined. The Timer goes
    /// first so no new events are produced while the others wind down.
    pub const SHUTDOWN_ORDER: [Role; 3] = [Role::Timer, Role::Model, Role::View];

    /// Lower-case name, used in thread names and log fields.
    pub fn name(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::View => "view",
            Self::Timer => "timer",
        }
    }

    /// Whether Stop/Start pause and resume this role.
    ///
    /// The Timer keeps ticking while the simulation is stopped.
    pub fn is_pausable(self) -> bool {
        matches!(self, Self::Model | Self::View)
    }

    /// Whether Restart resets this role.
    pub fn is_resettable(self) -> bool {
        matches!(self, Self::Model | Self::View)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_cover_every_role_once() {
        for order in [Role::START_ORDER, Role::SHUTDOWN_ORDER] {
            let mut sorted = order;
            sorted.sort();
            assert_eq!(sorted, [Role::Model, Role::View, Role::Timer]);
        }
    }

    #[test]
    fn timer_stops_first_and_starts_last() {
        assert_eq!(Role::SHUTDOWN_ORDER[0], Role::Timer);
        assert_eq!(Role::START_ORDER[2], Role::Timer);
    }

    #[test]
    fn timer_is_never_paused_or_reset() {
        assert!(!Role::Timer.is_pausable());
        assert!(!Role::Timer.is_resettable());
        assert!(Role::Model.is_pausable() && Role::View.is_resettable());
    }
}
