//! The boundary between the controller and the Model, View, and Timer.
//!
//! A [`Subsystem`] does not own its thread loop. The orchestrator runs a
//! driver on each worker thread that calls [`Subsystem::step`] repeatedly
//! and, between steps, honours cancellation, pause, reset, and looping
//! requests. Each call to `step` is therefore one safe point.

use std::thread;
use std::time::{Duration, Instant};

use convoy_core::{Event, Role, ScheduleError, SubsystemError};

use crate::sender::EventSender;
use crate::worker::WorkerControl;

/// What a step reports back to the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// More work remains.
    Continue,
    /// The run is complete. The driver idles until reset, or resets
    /// immediately when looping is enabled.
    Finished,
}

/// A Model, View, or Timer.
///
/// Implementations must keep individual steps short, or poll
/// [`StepContext::is_cancelled`] inside long ones, so that shutdown
/// completes within the grace period.
pub trait Subsystem: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Do one unit of work.
    fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError>;

    /// Return to the initial state. Called for Restart and for
    /// auto-restart in looping mode.
    fn reset(&mut self) -> Result<(), SubsystemError> {
        Ok(())
    }

    /// Looping mode was turned on or off.
    fn set_looping(&mut self, _looping: bool) {}

    /// Called once on the worker thread after the driver loop exits.
    fn on_stop(&mut self) {}
}

/// Per-step view of the worker's control block and the event queue.
pub struct StepContext<'a> {
    control: &'a WorkerControl,
    events: &'a EventSender,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(control: &'a WorkerControl, events: &'a EventSender) -> Self {
        Self { control, events }
    }

    /// Which worker this is.
    pub fn role(&self) -> Role {
        self.control.role()
    }

    /// Whether shutdown has been requested. Long steps should return
    /// early when this turns true.
    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    /// Whether looping mode is on.
    pub fn is_looping(&self) -> bool {
        self.control.is_looping()
    }

    /// Schedule an event on the controller's queue.
    pub fn schedule(&self, event: Event) -> Result<(), ScheduleError> {
        self.events.schedule(event)
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the worker
    /// was cancelled. Uses `park_timeout`, so the orchestrator's `unpark`
    /// on shutdown takes effect immediately.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.control.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

/// The three subsystems a controller runs.
pub struct Subsystems {
    /// Simulation state.
    pub model: Box<dyn Subsystem>,
    /// Rendering.
    pub view: Box<dyn Subsystem>,
    /// Periodic event producer.
    pub timer: Box<dyn Subsystem>,
}

impl Subsystems {
    /// Box and bundle three subsystems.
    pub fn new(
        model: impl Subsystem + 'static,
        view: impl Subsystem + 'static,
        timer: impl Subsystem + 'static,
    ) -> Self {
        Self {
            model: Box::new(model),
            view: Box::new(view),
            timer: Box::new(timer),
        }
    }

    pub(crate) fn into_role_map(self) -> [(Role, Box<dyn Subsystem>); 3] {
        [
            (Role::Model, self.model),
            (Role::View, self.view),
            (Role::Timer, self.timer),
        ]
    }
}

impl std::fmt::Debug for Subsystems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subsystems")
            .field("model", &self.model.name())
            .field("view", &self.view.name())
            .field("timer", &self.timer.name())
            .finish()
    }
}
