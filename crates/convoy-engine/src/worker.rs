//! Per-worker control block and the driver loop run on each worker thread.
//!
//! The orchestrator writes a [`WorkerControl`] from the controller thread;
//! the worker's driver reads it between steps. All flags are atomics, so
//! neither side ever blocks the other. Writers `unpark` the worker after
//! changing a flag, which cuts idle and sleep waits short.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, error, trace};

use convoy_core::{Role, SubsystemError};

use crate::sender::EventSender;
use crate::subsystem::{StepContext, StepOutcome, Subsystem};

/// Control flags and counters for one worker thread.
pub struct WorkerControl {
    role: Role,
    /// Cooperative cancellation. Never cleared once set.
    cancel: AtomicBool,
    paused: AtomicBool,
    looping: AtomicBool,
    /// Resets requested by the controller. The driver applies one reset
    /// per increment, so two Restarts reset twice even if coalesced.
    reset_requests: AtomicU64,
    resets_applied: AtomicU64,
    completions: AtomicU64,
    steps: AtomicU64,
}

// Compile-time assertion: WorkerControl is shared via Arc across threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<WorkerControl>();
};

impl WorkerControl {
    /// A fresh control block. Pausable roles start paused.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            cancel: AtomicBool::new(false),
            paused: AtomicBool::new(role.is_pausable()),
            looping: AtomicBool::new(false),
            reset_requests: AtomicU64::new(0),
            resets_applied: AtomicU64::new(0),
            completions: AtomicU64::new(0),
            steps: AtomicU64::new(0),
        }
    }

    /// The worker this block controls.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Request cancellation.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Whether the worker is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause or resume the worker.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Whether looping mode is on.
    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Acquire)
    }

    /// Turn looping mode on or off.
    pub fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::Release);
    }

    /// Ask the worker to reset once more.
    pub fn request_reset(&self) {
        self.reset_requests.fetch_add(1, Ordering::AcqRel);
    }

    /// Total resets requested so far.
    pub fn reset_requests(&self) -> u64 {
        self.reset_requests.load(Ordering::Acquire)
    }

    /// Requested resets the worker has carried out.
    pub fn resets_applied(&self) -> u64 {
        self.resets_applied.load(Ordering::Acquire)
    }

    /// Times the subsystem reported `Finished`.
    pub fn completions(&self) -> u64 {
        self.completions.load(Ordering::Acquire)
    }

    /// Steps executed.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for WorkerControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerControl")
            .field("role", &self.role)
            .field("cancelled", &self.is_cancelled())
            .field("paused", &self.is_paused())
            .field("looping", &self.is_looping())
            .field("steps", &self.steps())
            .finish()
    }
}

/// Signals the orchestrator when the worker thread is about to exit.
///
/// Sent from `Drop`, so it also fires while unwinding from a panic.
pub(crate) struct ExitSignal(Sender<()>);

impl ExitSignal {
    pub(crate) fn new(tx: Sender<()>) -> Self {
        Self(tx)
    }
}

impl Drop for ExitSignal {
    fn drop(&mut self) {
        // Receiver may already be gone if the orchestrator abandoned us.
        let _ = self.0.try_send(());
    }
}

/// Thread entry point for every worker.
///
/// The subsystem is dropped before this returns. The caller owns the
/// `ExitSignal` and drops it afterwards, so a subsystem `Drop` runs
/// inside the shutdown grace period.
pub(crate) fn worker_main(
    mut subsystem: Box<dyn Subsystem>,
    control: Arc<WorkerControl>,
    events: EventSender,
    idle: Duration,
) -> Result<(), SubsystemError> {
    let role = control.role();
    debug!(role = %role, subsystem = subsystem.name(), "worker started");

    let result = drive(subsystem.as_mut(), &control, &events, idle);
    subsystem.on_stop();
    drop(subsystem);

    match &result {
        Ok(()) => debug!(role = %role, steps = control.steps(), "worker stopped"),
        Err(e) => error!(role = %role, error = %e, "worker faulted"),
    }
    result
}

fn drive(
    subsystem: &mut dyn Subsystem,
    control: &WorkerControl,
    events: &EventSender,
    idle: Duration,
) -> Result<(), SubsystemError> {
    let mut resets_seen = 0u64;
    let mut looping = false;
    let mut finished = false;

    while !control.is_cancelled() {
        let requested = control.reset_requests();
        while resets_seen < requested {
            subsystem.reset()?;
            resets_seen += 1;
            control.resets_applied.fetch_add(1, Ordering::AcqRel);
            finished = false;
        }

        let want_looping = control.is_looping();
        if want_looping != looping {
            subsystem.set_looping(want_looping);
            looping = want_looping;
        }

        if finished && looping {
            trace!(role = %control.role(), "auto-restart");
            subsystem.reset()?;
            finished = false;
        }

        if control.is_paused() || finished {
            thread::park_timeout(idle);
            continue;
        }

        let ctx = StepContext::new(control, events);
        let outcome = subsystem.step(&ctx)?;
        control.steps.fetch_add(1, Ordering::AcqRel);
        if outcome == StepOutcome::Finished {
            control.completions.fetch_add(1, Ordering::AcqRel);
            finished = true;
        }
    }
    Ok(())
}
