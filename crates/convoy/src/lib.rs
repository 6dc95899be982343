//! Convoy: a threaded controller for Model/View/Timer simulations.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Convoy sub-crates. For most users, adding `convoy` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use convoy::prelude::*;
//! use std::time::Duration;
//!
//! // A subsystem that just ticks.
//! struct Ticker;
//! impl Subsystem for Ticker {
//!     fn name(&self) -> &str { "ticker" }
//!     fn step(&mut self, ctx: &StepContext<'_>) -> Result<StepOutcome, SubsystemError> {
//!         ctx.sleep(Duration::from_millis(1));
//!         Ok(StepOutcome::Continue)
//!     }
//! }
//!
//! let controller = Controller::new(
//!     ControllerConfig::default(),
//!     Subsystems::new(Ticker, Ticker, Ticker),
//! ).unwrap();
//! let sender = controller.sender();
//! sender.schedule(Event::Start).unwrap();
//! sender.schedule(Event::Loop).unwrap();
//! sender.schedule(Event::Close).unwrap();
//!
//! let report = controller.run().unwrap();
//! assert_eq!(report.final_state, RunState::Closing);
//! assert!(report.shutdown.is_clean());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `convoy-core` | Events, roles, run states, the transition table, errors |
//! | [`scenario`] | `convoy-scenario` | Map, dispatcher, and objects document loaders |
//! | [`engine`] | `convoy-engine` | Event queue, orchestrator, controller |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`convoy-core`).
///
/// The closed [`types::Event`] set, worker [`types::Role`]s, and the pure
/// [`types::transition`] function behind the run-state machine.
pub use convoy_core as types;

/// Scenario documents (`convoy-scenario`).
///
/// Implement [`scenario::ScenarioLoader`] or use
/// [`scenario::DirectoryLoader`] to read `map.cfg`, `dispatcher.cfg`, and
/// `objects.cfg`.
pub use convoy_scenario as scenario;

/// Controller engine (`convoy-engine`).
///
/// [`engine::Controller`] runs the main loop;
/// [`engine::ThreadOrchestrator`] owns the worker threads.
pub use convoy_engine as engine;

/// Common imports for typical Convoy usage.
///
/// ```rust
/// use convoy::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use convoy_core::{Event, Role, RunState};

    // Errors
    pub use convoy_core::{LifecycleError, ScheduleError, SubsystemError, ThreadFailure};

    // Scenario
    pub use convoy_scenario::{DirectoryLoader, Scenario, ScenarioError, ScenarioLoader};

    // Engine
    pub use convoy_engine::{
        ConfigError, Controller, ControllerConfig, EventSender, RunError, RunReport,
        ShutdownReport, StepContext, StepOutcome, Subsystem, Subsystems,
    };
}
