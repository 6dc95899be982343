//! Benchmark workloads for the Convoy simulation controller.
//!
//! - [`event_script`]: deterministic stream of control events via seed
//! - [`idle_subsystems`]: Model, View, and Timer that only sleep

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::time::Duration;

use convoy_core::{Event, SubsystemError};
use convoy_engine::{StepContext, StepOutcome, Subsystem, Subsystems};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Events a running simulation sees from its producers. Close is excluded.
pub const CONTROL_EVENTS: [Event; 4] = [Event::Start, Event::Stop, Event::Restart, Event::Loop];

/// `len` control events drawn uniformly from [`CONTROL_EVENTS`].
pub fn event_script(seed: u64, len: usize) -> Vec<Event> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| CONTROL_EVENTS[(rng.next_u32() as usize) % CONTROL_EVENTS.len()])
        .collect()
}

/// Sleeps in 1ms slices and never finishes.
pub struct IdleSubsystem;

impl Subsystem for IdleSubsystem {
    fn name(&self) -> &str {
        "idle"
    }

    fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
        ctx.sleep(Duration::from_millis(1));
        Ok(StepOutcome::Continue)
    }
}

/// Three [`IdleSubsystem`]s, so benchmarks measure controller overhead only.
pub fn idle_subsystems() -> Subsystems {
    Subsystems::new(IdleSubsystem, IdleSubsystem, IdleSubsystem)
}
