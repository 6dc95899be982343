//! Start, pause, reset, and shutdown of the Model, View, and Timer threads.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──run_threads()──> Started ──end_threads()──> Ended
//!   │                                                  ▲
//!   └──────────────────end_threads()───────────────────┘
//! ```
//!
//! Each worker gets a [`WorkerControl`] and a bounded(1) exit channel.
//! `end_threads()` walks [`Role::SHUTDOWN_ORDER`]: cancel, unpark, wait
//! on the exit channel up to the grace period, then join. A worker that
//! misses the deadline is abandoned and reported, and shutdown moves on
//! to the next one.

use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use convoy_core::{LifecycleError, Role, SubsystemError, ThreadFailure};

use crate::sender::EventSender;
use crate::subsystem::{Subsystem, Subsystems};
use crate::worker::{worker_main, ExitSignal, WorkerControl};

// ── ShutdownReport ───────────────────────────────────────────────

/// Outcome of [`ThreadOrchestrator::end_threads`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Total time spent stopping and joining, in milliseconds.
    pub total_ms: u64,
    /// Workers whose threads were joined, in join order. A joined worker
    /// may still appear in `failures` if it panicked or faulted.
    pub joined: SmallVec<[Role; 3]>,
    /// Workers that did not shut down cleanly.
    pub failures: SmallVec<[ThreadFailure; 3]>,
}

impl ShutdownReport {
    /// `true` when every started worker was joined without failure.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Workers that were abandoned after the grace period.
    pub fn abandoned(&self) -> impl Iterator<Item = Role> + '_ {
        self.failures.iter().filter_map(|f| match f {
            ThreadFailure::Timeout { role, .. } => Some(*role),
            _ => None,
        })
    }
}

// ── ThreadOrchestrator ───────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Started,
    Ended,
}

struct WorkerThread {
    handle: JoinHandle<Result<(), SubsystemError>>,
    exited: Receiver<()>,
}

struct WorkerSlot {
    role: Role,
    subsystem: Option<Box<dyn Subsystem>>,
    control: Arc<WorkerControl>,
    thread: Option<WorkerThread>,
}

/// Owns the three worker threads and their control blocks.
pub struct ThreadOrchestrator {
    /// Indexed in `Role::START_ORDER`.
    slots: [WorkerSlot; 3],
    events: EventSender,
    grace: Duration,
    idle: Duration,
    name_prefix: String,
    phase: Phase,
}

impl ThreadOrchestrator {
    /// Wrap `subsystems`. Nothing is spawned until [`run_threads()`].
    ///
    /// [`run_threads()`]: ThreadOrchestrator::run_threads
    pub fn new(
        subsystems: Subsystems,
        events: EventSender,
        grace: Duration,
        idle: Duration,
        name_prefix: impl Into<String>,
    ) -> Self {
        let slots = subsystems.into_role_map().map(|(role, subsystem)| WorkerSlot {
            role,
            subsystem: Some(subsystem),
            control: Arc::new(WorkerControl::new(role)),
            thread: None,
        });
        Self {
            slots,
            events,
            grace,
            idle,
            name_prefix: name_prefix.into(),
            phase: Phase::Idle,
        }
    }

    fn slot(&self, role: Role) -> &WorkerSlot {
        &self.slots[slot_index(role)]
    }

    fn slot_mut(&mut self, role: Role) -> &mut WorkerSlot {
        &mut self.slots[slot_index(role)]
    }

    /// Spawn the Model, View, and Timer threads, in that order.
    ///
    /// Model and View start paused; call [`resume()`](Self::resume) to
    /// let them step. Calling this twice is a precondition violation and
    /// returns an error rather than spawning again.
    ///
    /// If a spawn fails, workers spawned before it keep running and are
    /// cleaned up by [`end_threads()`](Self::end_threads).
    pub fn run_threads(&mut self) -> Result<(), LifecycleError> {
        match self.phase {
            Phase::Started => return Err(LifecycleError::AlreadyStarted),
            Phase::Ended => return Err(LifecycleError::AlreadyEnded),
            Phase::Idle => {}
        }
        self.phase = Phase::Started;

        for role in Role::START_ORDER {
            let events = self.events.clone();
            let idle = self.idle;
            let name = format!("{}-{}", self.name_prefix, role);

            let slot = self.slot_mut(role);
            let subsystem = slot.subsystem.take().ok_or(LifecycleError::AlreadyEnded)?;
            let control = Arc::clone(&slot.control);
            let (exit_tx, exit_rx) = crossbeam_channel::bounded(1);

            let handle = thread::Builder::new()
                .name(name)
                .spawn(move || {
                    // Declared first so it drops last, after the subsystem.
                    let _exit = ExitSignal::new(exit_tx);
                    worker_main(subsystem, control, events, idle)
                })
                .map_err(|e| LifecycleError::SpawnFailed {
                    role,
                    reason: e.to_string(),
                })?;

            slot.thread = Some(WorkerThread {
                handle,
                exited: exit_rx,
            });
            debug!(role = %role, "worker thread spawned");
        }

        info!("worker threads started");
        Ok(())
    }

    /// Cancel and join every worker in [`Role::SHUTDOWN_ORDER`].
    ///
    /// Each worker gets the full grace period after its own cancellation.
    /// Safe to call more than once; later calls return an empty report.
    pub fn end_threads(&mut self) -> ShutdownReport {
        let start = Instant::now();
        let mut report = ShutdownReport::default();

        if self.phase == Phase::Ended {
            return report;
        }
        self.phase = Phase::Ended;

        let grace = self.grace;
        for role in Role::SHUTDOWN_ORDER {
            let slot = self.slot_mut(role);
            slot.control.request_cancel();
            slot.subsystem = None;
            let Some(worker) = slot.thread.take() else {
                continue;
            };
            worker.handle.thread().unpark();

            match worker.exited.recv_timeout(grace) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
                Err(RecvTimeoutError::Timeout) if !worker.handle.is_finished() => {
                    warn!(role = %role, grace_ms = grace.as_millis() as u64, "worker ignored cancellation, abandoning thread");
                    report.failures.push(ThreadFailure::Timeout {
                        role,
                        grace_ms: grace.as_millis() as u64,
                    });
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            match worker.handle.join() {
                Ok(Ok(())) => {
                    debug!(role = %role, "worker joined");
                }
                Ok(Err(error)) => {
                    warn!(role = %role, error = %error, "worker exited with a fault");
                    report.failures.push(ThreadFailure::Faulted { role, error });
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(role = %role, message = %message, "worker panicked");
                    report
                        .failures
                        .push(ThreadFailure::Panicked { role, message });
                }
            }
            report.joined.push(role);
        }

        report.total_ms = start.elapsed().as_millis() as u64;
        if report.is_clean() {
            info!(total_ms = report.total_ms, joined = report.joined.len(), "worker threads ended");
        } else {
            warn!(
                total_ms = report.total_ms,
                failures = report.failures.len(),
                "worker threads ended with failures"
            );
        }
        report
    }

    /// Suspend Model and View at their next safe point.
    pub fn pause(&self) {
        self.for_each_pausable(|c| c.set_paused(true));
    }

    /// Let Model and View step.
    pub fn resume(&self) {
        self.for_each_pausable(|c| c.set_paused(false));
    }

    /// Ask Model and View to reset before their next step.
    pub fn reset(&self) {
        for slot in self.slots.iter().filter(|s| s.role.is_resettable()) {
            slot.control.request_reset();
            Self::wake(slot);
        }
    }

    /// Turn auto-restart-on-completion on or off in the Model.
    pub fn set_looping(&self, looping: bool) {
        let slot = self.slot(Role::Model);
        slot.control.set_looping(looping);
        Self::wake(slot);
    }

    fn for_each_pausable(&self, f: impl Fn(&WorkerControl)) {
        for slot in self.slots.iter().filter(|s| s.role.is_pausable()) {
            f(&slot.control);
            Self::wake(slot);
        }
    }

    fn wake(slot: &WorkerSlot) {
        if let Some(worker) = &slot.thread {
            worker.handle.thread().unpark();
        }
    }

    /// Whether `run_threads()` has been called and `end_threads()` has not.
    pub fn is_started(&self) -> bool {
        self.phase == Phase::Started
    }

    /// Whether `end_threads()` has run.
    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    /// Threads that are spawned, not yet joined, and still running.
    pub fn live_workers(&self) -> SmallVec<[Role; 3]> {
        self.slots
            .iter()
            .filter(|s| s.thread.as_ref().is_some_and(|w| !w.handle.is_finished()))
            .map(|s| s.role)
            .collect()
    }

    /// Threads that are spawned and not yet joined, running or not.
    pub fn joinable_workers(&self) -> SmallVec<[Role; 3]> {
        self.slots
            .iter()
            .filter(|s| s.thread.is_some())
            .map(|s| s.role)
            .collect()
    }

    /// The control block for `role`.
    pub fn control(&self, role: Role) -> &Arc<WorkerControl> {
        &self.slot(role).control
    }
}

impl Drop for ThreadOrchestrator {
    fn drop(&mut self) {
        if self.phase == Phase::Started {
            let report = self.end_threads();
            if !report.is_clean() {
                warn!(failures = report.failures.len(), "unclean shutdown while dropping orchestrator");
            }
        }
    }
}

impl std::fmt::Debug for ThreadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadOrchestrator")
            .field("phase", &self.phase)
            .field("grace", &self.grace)
            .field("joinable", &self.joinable_workers())
            .finish()
    }
}

fn slot_index(role: Role) -> usize {
    match role {
        Role::Model => 0,
        Role::View => 1,
        Role::Timer => 2,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EventQueue;
    use crate::subsystem::{StepContext, StepOutcome};
    use convoy_core::Event;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Steps forever in 1ms sleeps.
    struct Idle;

    impl Subsystem for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
            ctx.sleep(Duration::from_millis(1));
            Ok(StepOutcome::Continue)
        }
    }

    /// Ignores cancellation until `release` is set.
    struct Stubborn {
        release: Arc<AtomicBool>,
    }

    impl Subsystem for Stubborn {
        fn name(&self) -> &str {
            "stubborn"
        }

        fn step(&mut self, _ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
            while !self.release.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(2));
            }
            Ok(StepOutcome::Continue)
        }
    }

    struct Faulty;

    impl Subsystem for Faulty {
        fn name(&self) -> &str {
            "faulty"
        }

        fn step(&mut self, _ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
            Err(SubsystemError::step("sensor offline"))
        }
    }

    struct Panicky;

    impl Subsystem for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        fn step(&mut self, _ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
            panic!("render target lost");
        }
    }

    fn orchestrator(subsystems: Subsystems, grace_ms: u64) -> ThreadOrchestrator {
        let queue = Arc::new(EventQueue::<Event>::unbounded());
        ThreadOrchestrator::new(
            subsystems,
            EventSender::new(queue),
            Duration::from_millis(grace_ms),
            Duration::from_millis(1),
            "test",
        )
    }

    fn wait_until(cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not met within 5s");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn start_and_end_cleanly() {
        let mut o = orchestrator(Subsystems::new(Idle, Idle, Idle), 1000);
        assert!(!o.is_started());
        o.run_threads().unwrap();
        assert!(o.is_started());
        assert_eq!(o.live_workers().len(), 3);

        let report = o.end_threads();
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.joined.as_slice(), &Role::SHUTDOWN_ORDER);
        assert!(o.is_ended());
        assert!(o.joinable_workers().is_empty());
    }

    #[test]
    fn second_run_threads_is_rejected() {
        let mut o = orchestrator(Subsystems::new(Idle, Idle, Idle), 1000);
        o.run_threads().unwrap();
        assert_eq!(o.run_threads(), Err(LifecycleError::AlreadyStarted));
        o.end_threads();
        assert_eq!(o.run_threads(), Err(LifecycleError::AlreadyEnded));
    }

    #[test]
    fn second_end_threads_is_empty() {
        let mut o = orchestrator(Subsystems::new(Idle, Idle, Idle), 1000);
        o.run_threads().unwrap();
        o.end_threads();
        let again = o.end_threads();
        assert!(again.is_clean());
        assert!(again.joined.is_empty());
    }

    #[test]
    fn end_without_start_joins_nothing() {
        let mut o = orchestrator(Subsystems::new(Idle, Idle, Idle), 1000);
        let report = o.end_threads();
        assert!(report.is_clean());
        assert!(report.joined.is_empty());
        assert!(o.is_ended());
    }

    #[test]
    fn workers_start_paused_and_resume() {
        let mut o = orchestrator(Subsystems::new(Idle, Idle, Idle), 1000);
        o.run_threads().unwrap();
        wait_until(|| o.control(Role::Timer).steps() > 0);
        assert_eq!(o.control(Role::Model).steps(), 0);
        assert_eq!(o.control(Role::View).steps(), 0);

        o.resume();
        wait_until(|| o.control(Role::Model).steps() > 0 && o.control(Role::View).steps() > 0);

        o.pause();
        assert!(o.control(Role::Model).is_paused());
        assert!(!o.control(Role::Timer).is_paused());
        assert!(o.end_threads().is_clean());
    }

    #[test]
    fn reset_and_looping_target_the_right_roles() {
        let mut o = orchestrator(Subsystems::new(Idle, Idle, Idle), 1000);
        o.run_threads().unwrap();
        o.reset();
        o.set_looping(true);
        assert_eq!(o.control(Role::Model).reset_requests(), 1);
        assert_eq!(o.control(Role::View).reset_requests(), 1);
        assert_eq!(o.control(Role::Timer).reset_requests(), 0);
        assert!(o.control(Role::Model).is_looping());
        assert!(!o.control(Role::View).is_looping());
        wait_until(|| o.control(Role::View).resets_applied() == 1);
        o.end_threads();
    }

    #[test]
    fn hung_worker_times_out_and_others_still_join() {
        let release = Arc::new(AtomicBool::new(false));
        let stubborn = Stubborn {
            release: Arc::clone(&release),
        };
        let mut o = orchestrator(Subsystems::new(Idle, Idle, stubborn), 50);
        o.run_threads().unwrap();
        thread::sleep(Duration::from_millis(10));

        let start = Instant::now();
        let report = o.end_threads();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(!report.is_clean());
        assert_eq!(report.abandoned().collect::<Vec<_>>(), vec![Role::Timer]);
        assert_eq!(report.joined.as_slice(), &[Role::Model, Role::View]);

        // Let the abandoned thread finish so the test process stays tidy.
        release.store(true, Ordering::Release);
    }

    #[test]
    fn fault_and_panic_are_reported() {
        let mut o = orchestrator(Subsystems::new(Faulty, Panicky, Idle), 1000);
        o.run_threads().unwrap();
        o.resume();
        wait_until(|| o.live_workers().len() == 1);

        let report = o.end_threads();
        assert_eq!(report.joined.len(), 3);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().any(|f| matches!(
            f,
            ThreadFailure::Faulted { role: Role::Model, .. }
        )));
        assert!(report.failures.iter().any(|f| matches!(
            f,
            ThreadFailure::Panicked { role: Role::View, message } if message == "render target lost"
        )));
    }

    #[test]
    fn drop_ends_running_threads() {
        let mut o = orchestrator(Subsystems::new(Idle, Idle, Idle), 1000);
        o.run_threads().unwrap();
        let model = Arc::clone(o.control(Role::Model));
        drop(o);
        assert!(model.is_cancelled());
    }
}
