//! Reusable subsystem fixtures.
//!
//! - [`CountingSubsystem`] steps forever (or finishes after N steps) and
//!   records what the driver did to it in a shared [`Tally`].
//! - [`TickTimer`] sleeps a fixed period and schedules an event each tick.
//! - [`HangingSubsystem`] ignores cancellation until released.
//! - [`PanickingSubsystem`] panics after N steps.
//! - [`FailingSubsystem`] returns an error after N steps.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use convoy_core::{Event, SubsystemError};
use convoy_engine::{StepContext, StepOutcome, Subsystem};

// ── Tally ────────────────────────────────────────────────────────

/// Shared view of what happened to a [`CountingSubsystem`].
#[derive(Debug, Default)]
pub struct Tally {
    steps: AtomicU64,
    resets: AtomicU64,
    completions: AtomicU64,
    looping: AtomicBool,
    stopped: AtomicBool,
}

impl Tally {
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Acquire)
    }

    /// Calls to `reset()`, auto-restarts included.
    pub fn resets(&self) -> u64 {
        self.resets.load(Ordering::Acquire)
    }

    pub fn completions(&self) -> u64 {
        self.completions.load(Ordering::Acquire)
    }

    /// Last value passed to `set_looping()`.
    pub fn looping(&self) -> bool {
        self.looping.load(Ordering::Acquire)
    }

    /// Whether `on_stop()` has run.
    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

// ── CountingSubsystem ────────────────────────────────────────────

/// Counts steps and resets. Optionally finishes after a fixed run length.
pub struct CountingSubsystem {
    name: String,
    tally: Arc<Tally>,
    finish_after: Option<u64>,
    position: u64,
    step_delay: Duration,
}

impl CountingSubsystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tally: Arc::new(Tally::default()),
            finish_after: None,
            position: 0,
            step_delay: Duration::from_millis(1),
        }
    }

    /// Report `Finished` once `steps` steps have run since the last reset.
    pub fn finish_after(mut self, steps: u64) -> Self {
        self.finish_after = Some(steps);
        self
    }

    /// Cancellable sleep inside every step. Default: 1ms.
    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Shared handle to this subsystem's counters.
    pub fn tally(&self) -> Arc<Tally> {
        Arc::clone(&self.tally)
    }
}

impl Subsystem for CountingSubsystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
        if !ctx.sleep(self.step_delay) {
            return Ok(StepOutcome::Continue);
        }
        self.position += 1;
        self.tally.steps.fetch_add(1, Ordering::AcqRel);
        match self.finish_after {
            Some(n) if self.position >= n => {
                self.tally.completions.fetch_add(1, Ordering::AcqRel);
                Ok(StepOutcome::Finished)
            }
            _ => Ok(StepOutcome::Continue),
        }
    }

    fn reset(&mut self) -> Result<(), SubsystemError> {
        self.position = 0;
        self.tally.resets.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn set_looping(&mut self, looping: bool) {
        self.tally.looping.store(looping, Ordering::Release);
    }

    fn on_stop(&mut self) {
        self.tally.stopped.store(true, Ordering::Release);
    }
}

// ── TickTimer ────────────────────────────────────────────────────

/// Sleeps `period`, then schedules `event` (if any) on the controller.
///
/// Scheduling failures after close are expected and ignored.
pub struct TickTimer {
    period: Duration,
    event: Option<Event>,
    ticks: Arc<AtomicU64>,
}

impl TickTimer {
    pub fn new(period: Duration, event: Event) -> Self {
        Self {
            period,
            event: Some(event),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A timer that ticks without scheduling anything.
    pub fn silent(period: Duration) -> Self {
        Self {
            period,
            event: None,
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared tick counter.
    pub fn ticks(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.ticks)
    }
}

impl Subsystem for TickTimer {
    fn name(&self) -> &str {
        "tick-timer"
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
        if !ctx.sleep(self.period) {
            return Ok(StepOutcome::Continue);
        }
        self.ticks.fetch_add(1, Ordering::AcqRel);
        if let Some(event) = self.event {
            let _ = ctx.schedule(event);
        }
        Ok(StepOutcome::Continue)
    }
}

// ── HangingSubsystem ─────────────────────────────────────────────

/// Never returns from `step` until released, whatever the cancel flag says.
pub struct HangingSubsystem {
    release: Arc<AtomicBool>,
}

impl HangingSubsystem {
    pub fn new() -> Self {
        Self {
            release: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the returned flag lets the stuck step return.
    pub fn release_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.release)
    }
}

impl Default for HangingSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Subsystem for HangingSubsystem {
    fn name(&self) -> &str {
        "hanging"
    }

    fn step(&mut self, _ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
        while !self.release.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(2));
        }
        Ok(StepOutcome::Continue)
    }
}

// ── PanickingSubsystem ───────────────────────────────────────────

/// Panics with `message` on step number `after + 1`.
pub struct PanickingSubsystem {
    message: &'static str,
    after: u64,
    steps: u64,
}

impl PanickingSubsystem {
    pub fn new(message: &'static str, after: u64) -> Self {
        Self {
            message,
            after,
            steps: 0,
        }
    }
}

impl Subsystem for PanickingSubsystem {
    fn name(&self) -> &str {
        "panicking"
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
        if self.steps >= self.after {
            panic!("{}", self.message);
        }
        self.steps += 1;
        ctx.sleep(Duration::from_millis(1));
        Ok(StepOutcome::Continue)
    }
}

// ── FailingSubsystem ─────────────────────────────────────────────

/// Returns `SubsystemError::StepFailed` on step number `after + 1`.
pub struct FailingSubsystem {
    reason: String,
    after: u64,
    steps: u64,
}

impl FailingSubsystem {
    pub fn new(reason: impl Into<String>, after: u64) -> Self {
        Self {
            reason: reason.into(),
            after,
            steps: 0,
        }
    }
}

impl Subsystem for FailingSubsystem {
    fn name(&self) -> &str {
        "failing"
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
        if self.steps >= self.after {
            return Err(SubsystemError::step(self.reason.clone()));
        }
        self.steps += 1;
        ctx.sleep(Duration::from_millis(1));
        Ok(StepOutcome::Continue)
    }
}
