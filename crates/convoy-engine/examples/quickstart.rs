//! Convoy Quickstart: a voyager crossing a one-lane road.
//!
//! Demonstrates:
//!   1. Implementing the `Subsystem` trait for a Model, View, and Timer
//!   2. Sharing model state with the View through an atomic
//!   3. A Timer that drives the run by scheduling events
//!   4. Running the controller and reading the final `RunReport`
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example quickstart

use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use convoy_core::{Event, SubsystemError};
use convoy_engine::{Controller, ControllerConfig, StepContext, StepOutcome, Subsystem, Subsystems};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ─── Road parameters ────────────────────────────────────────────

const ROAD_LENGTH: u64 = 40;
const SPEED: u64 = 2;
const FRAME: Duration = Duration::from_millis(20);

// ─── Model: one voyager driving to the end of the road ──────────

struct Road {
    position: Arc<AtomicU64>,
}

impl Subsystem for Road {
    fn name(&self) -> &str {
        "road"
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
        ctx.sleep(FRAME);
        let next = (self.position.load(Ordering::Acquire) + SPEED).min(ROAD_LENGTH);
        self.position.store(next, Ordering::Release);
        if next == ROAD_LENGTH {
            Ok(StepOutcome::Finished)
        } else {
            Ok(StepOutcome::Continue)
        }
    }

    fn reset(&mut self) -> Result<(), SubsystemError> {
        self.position.store(0, Ordering::Release);
        Ok(())
    }
}

// ─── View: logs the voyager's position ──────────────────────────

struct Console {
    position: Arc<AtomicU64>,
    frames: u64,
}

impl Subsystem for Console {
    fn name(&self) -> &str {
        "console"
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
        ctx.sleep(FRAME * 5);
        self.frames += 1;
        let pos = self.position.load(Ordering::Acquire);
        let lane: String = (0..=ROAD_LENGTH)
            .map(|i| if i == pos { '>' } else { '.' })
            .collect();
        info!(frame = self.frames, "{lane}");
        Ok(StepOutcome::Continue)
    }

    fn on_stop(&mut self) {
        info!(frames = self.frames, "console closed");
    }
}

// ─── Timer: plays a fixed script of events ──────────────────────

struct Script {
    cues: Vec<(Duration, Event)>,
    next: usize,
}

impl Subsystem for Script {
    fn name(&self) -> &str {
        "script"
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
        let Some(&(wait, event)) = self.cues.get(self.next) else {
            return Ok(StepOutcome::Finished);
        };
        if ctx.sleep(wait) {
            info!(event = %event, "cue");
            // Fails only once the controller has closed.
            let _ = ctx.schedule(event);
            self.next += 1;
        }
        Ok(StepOutcome::Continue)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let position = Arc::new(AtomicU64::new(0));
    let subsystems = Subsystems::new(
        Road {
            position: Arc::clone(&position),
        },
        Console {
            position: Arc::clone(&position),
            frames: 0,
        },
        Script {
            cues: vec![
                (Duration::from_millis(600), Event::Stop),
                (Duration::from_millis(300), Event::Start),
                (Duration::from_millis(500), Event::Restart),
                (Duration::from_millis(300), Event::Loop),
                (Duration::from_millis(1500), Event::Close),
            ],
            next: 0,
        },
    );

    let controller = Controller::new(ControllerConfig::default(), subsystems)?;
    controller.schedule_event(Event::Start)?;

    let report = controller.run()?;
    println!(
        "final state {} after {}ms: {} events dispatched, {} ignored",
        report.final_state,
        report.elapsed_ms,
        report.metrics.events_dispatched,
        report.metrics.events_ignored,
    );
    Ok(())
}
