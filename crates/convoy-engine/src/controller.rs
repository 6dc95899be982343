//! The controller: event intake, the run-state machine, and the main loop.
//!
//! ```text
//! Producers (Timer, input, tests)        Controller thread
//!     |                                       |
//!     |--schedule_event()---> EventQueue ---> wait_and_dequeue()
//!     |   [push + notify_one]                 machine.apply(event)
//!     |                                       apply effects -> ThreadOrchestrator
//!     |                                       metrics.record()
//!     |                                       (repeat while alive)
//! ```
//!
//! `run()` returns once `Close` has been dispatched and every worker has
//! been joined or abandoned after its grace period.

use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use convoy_core::{
    Effect, Event, LifecycleError, RunState, RunStateMachine, ScheduleError, Transition,
};
use convoy_scenario::{Scenario, ScenarioLoader};

use crate::config::{ConfigError, ControllerConfig};
use crate::metrics::ControllerMetrics;
use crate::orchestrator::{ShutdownReport, ThreadOrchestrator};
use crate::queue::{Dequeued, EventQueue};
use crate::sender::EventSender;
use crate::subsystem::Subsystems;

// ── RunReport / RunError ─────────────────────────────────────────

/// Summary of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// State when the loop exited. `Closing` for every completed run.
    pub final_state: RunState,
    /// Dispatch counters.
    pub metrics: ControllerMetrics,
    /// Result of ending the worker threads.
    pub shutdown: ShutdownReport,
    /// Time from construction to the end of the run, in milliseconds.
    pub elapsed_ms: u64,
}

/// Error returned by [`Controller::run`].
#[derive(Debug, PartialEq, Eq)]
pub enum RunError {
    /// A lifecycle operation failed and the run was aborted.
    Lifecycle {
        /// What went wrong.
        error: LifecycleError,
        /// State of the run at abort, after the threads were ended.
        report: Box<RunReport>,
    },
    /// The run closed but at least one worker failed to shut down cleanly.
    ShutdownFailed(Box<RunReport>),
}

impl RunError {
    /// The report collected before the error was returned.
    pub fn report(&self) -> &RunReport {
        match self {
            Self::Lifecycle { report, .. } | Self::ShutdownFailed(report) => report,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lifecycle { error, .. } => write!(f, "run aborted: {error}"),
            Self::ShutdownFailed(report) => {
                write!(f, "unclean shutdown: ")?;
                for (i, failure) in report.shutdown.failures.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{failure}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lifecycle { error, .. } => Some(error),
            Self::ShutdownFailed(report) => report
                .shutdown
                .failures
                .first()
                .map(|f| f as &(dyn Error + 'static)),
        }
    }
}

// ── Controller ───────────────────────────────────────────────────

/// Owns the event queue, the run-state machine, and the worker threads.
///
/// Producers on any thread schedule events through
/// [`schedule_event()`](Self::schedule_event) or a cloned
/// [`EventSender`]. The thread that calls [`run()`](Self::run) becomes the
/// single consumer and is the only writer of run state.
///
/// # Example
///
/// ```
/// use convoy_engine::{Controller, ControllerConfig, StepContext, StepOutcome, Subsystem, Subsystems};
/// use convoy_core::{Event, RunState, SubsystemError};
///
/// struct Noop;
///
/// impl Subsystem for Noop {
///     fn name(&self) -> &str { "noop" }
///     fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
///         ctx.sleep(std::time::Duration::from_millis(1));
///         Ok(StepOutcome::Continue)
///     }
/// }
///
/// let controller = Controller::new(
///     ControllerConfig::default(),
///     Subsystems::new(Noop, Noop, Noop),
/// ).unwrap();
/// controller.schedule_event(Event::Start).unwrap();
/// controller.schedule_event(Event::Close).unwrap();
///
/// let report = controller.run().unwrap();
/// assert_eq!(report.final_state, RunState::Closing);
/// assert_eq!(report.metrics.events_dispatched, 2);
/// ```
pub struct Controller {
    queue: Arc<EventQueue<Event>>,
    machine: RunStateMachine,
    orchestrator: ThreadOrchestrator,
    metrics: ControllerMetrics,
    shutdown: Option<ShutdownReport>,
    created: Instant,
}

impl Controller {
    /// Validate `config` and wrap `subsystems`. No thread is spawned
    /// until the first event that needs one is dispatched.
    pub fn new(config: ControllerConfig, subsystems: Subsystems) -> Result<Self, ConfigError> {
        config.validate()?;

        let queue = Arc::new(EventQueue::with_capacity(config.queue_capacity));
        let orchestrator = ThreadOrchestrator::new(
            subsystems,
            EventSender::new(Arc::clone(&queue)),
            config.shutdown_grace(),
            config.idle_park(),
            config.thread_name_prefix.clone(),
        );

        debug!(
            grace_ms = config.shutdown_grace_ms,
            capacity = ?config.queue_capacity,
            "controller created"
        );

        Ok(Self {
            queue,
            machine: RunStateMachine::new(),
            orchestrator,
            metrics: ControllerMetrics::default(),
            shutdown: None,
            created: Instant::now(),
        })
    }

    /// Load the map, dispatcher, and objects documents from `root`, build
    /// the subsystems from them, and construct the controller.
    ///
    /// `config` is validated before anything is read. Any failure aborts
    /// construction before a thread exists.
    pub fn load<L, F>(
        config: ControllerConfig,
        root: &Path,
        loader: &L,
        build: F,
    ) -> Result<Self, ConfigError>
    where
        L: ScenarioLoader + ?Sized,
        F: FnOnce(&Scenario) -> Result<Subsystems, ConfigError>,
    {
        config.validate()?;
        let scenario = loader.load(root)?;
        info!(root = %root.display(), "scenario loaded");
        let subsystems = build(&scenario)?;
        Self::new(config, subsystems)
    }

    /// A cloneable handle for scheduling events from other threads.
    pub fn sender(&self) -> EventSender {
        EventSender::new(Arc::clone(&self.queue))
    }

    /// Append `event` to the queue. Callable from any thread holding a
    /// reference; fails once `Close` has been dispatched.
    pub fn schedule_event(&self, event: Event) -> Result<(), ScheduleError> {
        self.queue.push(event).map_err(ScheduleError::from)
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.machine.state()
    }

    /// `false` once `Closing` has been entered.
    pub fn is_alive(&self) -> bool {
        self.machine.is_alive()
    }

    /// Dispatch counters so far.
    pub fn metrics(&self) -> &ControllerMetrics {
        &self.metrics
    }

    /// The worker threads.
    pub fn orchestrator(&self) -> &ThreadOrchestrator {
        &self.orchestrator
    }

    /// The shutdown report, once the threads have been ended.
    pub fn shutdown_report(&self) -> Option<&ShutdownReport> {
        self.shutdown.as_ref()
    }

    /// Apply `event` to the state machine and carry out its effects.
    ///
    /// Bypasses the queue. If an effect fails the run is aborted: the
    /// machine is forced into `Closing`, the queue is closed, and the
    /// threads are ended before the error is returned.
    pub fn dispatch(&mut self, event: Event) -> Result<Transition, LifecycleError> {
        let t = self.machine.apply(event);
        self.metrics.record(&t);

        if t.is_ignored() {
            debug!(event = %event, state = %t.from, "event ignored");
            return Ok(t);
        }
        debug!(event = %event, from = %t.from, to = %t.to, "dispatch");

        for effect in &t.effects {
            if let Err(error) = self.apply(*effect) {
                warn!(event = %event, error = %error, "lifecycle failure, aborting run");
                self.abort();
                return Err(error);
            }
        }
        Ok(t)
    }

    fn apply(&mut self, effect: Effect) -> Result<(), LifecycleError> {
        trace!(effect = ?effect, "apply");
        match effect {
            Effect::EnsureStarted => {
                if !self.orchestrator.is_started() {
                    self.orchestrator.run_threads()?;
                }
            }
            Effect::Resume => self.orchestrator.resume(),
            Effect::Pause => self.orchestrator.pause(),
            Effect::Reset => self.orchestrator.reset(),
            Effect::SetLooping(on) => self.orchestrator.set_looping(on),
            Effect::EndThreads => {
                self.queue.close();
                self.end_threads();
            }
        }
        Ok(())
    }

    fn end_threads(&mut self) {
        let report = self.orchestrator.end_threads();
        if self.shutdown.is_none() {
            self.shutdown = Some(report);
        }
    }

    fn abort(&mut self) {
        self.machine.force_close();
        self.queue.close();
        self.end_threads();
    }

    /// Block for the next event and dispatch it.
    ///
    /// Returns `Ok(None)` without blocking once the controller has closed,
    /// and when the queue was shut down with nothing left to deliver.
    pub fn step(&mut self) -> Result<Option<Transition>, LifecycleError> {
        if !self.machine.is_alive() {
            return Ok(None);
        }
        match self.queue.wait_and_dequeue() {
            Dequeued::Item(event) => self.dispatch(event).map(Some),
            Dequeued::Shutdown => Ok(None),
        }
    }

    /// Run the main loop until `Close` is dispatched, then return once all
    /// worker threads have been ended.
    ///
    /// Events still queued after `Close` are discarded and counted in
    /// [`ControllerMetrics::events_discarded`].
    pub fn run(mut self) -> Result<RunReport, RunError> {
        info!(state = %self.machine.state(), "controller running");

        while self.machine.is_alive() {
            match self.step() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(error) => {
                    let report = self.finish();
                    return Err(RunError::Lifecycle {
                        error,
                        report: Box::new(report),
                    });
                }
            }
        }

        let report = self.finish();
        if report.shutdown.is_clean() {
            info!(
                dispatched = report.metrics.events_dispatched,
                elapsed_ms = report.elapsed_ms,
                "controller closed"
            );
            Ok(report)
        } else {
            Err(RunError::ShutdownFailed(Box::new(report)))
        }
    }

    fn finish(&mut self) -> RunReport {
        if self.machine.is_alive() {
            // Queue shut down before Close was seen.
            self.machine.force_close();
        }
        self.queue.close();
        self.end_threads();

        let discarded = self.queue.drain().len() as u64;
        if discarded > 0 {
            debug!(discarded, "discarding events queued after close");
        }
        self.metrics.events_discarded += discarded;

        RunReport {
            final_state: self.machine.state(),
            metrics: self.metrics.clone(),
            shutdown: self.shutdown.clone().unwrap_or_default(),
            elapsed_ms: self.created.elapsed().as_millis() as u64,
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        // The orchestrator ends its own threads; producers must stop here.
        self.queue.close();
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.machine.state())
            .field("pending", &self.queue.len())
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}
