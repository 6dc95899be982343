//! Controller engine for Convoy simulations.
//!
//! Provides the [`Controller`] that owns the event queue and the run-state
//! machine, and the [`ThreadOrchestrator`] that starts, pauses, resets,
//! and joins the Model, View, and Timer worker threads. Subsystems plug in
//! through the [`Subsystem`] trait and are driven one step at a time.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod sender;
pub mod subsystem;
pub mod worker;

pub use config::{ConfigError, ControllerConfig};
pub use controller::{Controller, RunError, RunReport};
pub use metrics::ControllerMetrics;
pub use orchestrator::{ShutdownReport, ThreadOrchestrator};
pub use queue::{Dequeued, EnqueueError, EventQueue};
pub use sender::EventSender;
pub use subsystem::{StepContext, StepOutcome, Subsystem, Subsystems};
pub use worker::WorkerControl;
