//! Core types for the Convoy simulation controller.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! closed [`Event`] set, worker [`Role`]s, the [`RunState`] machine with
//! its pure transition table, and the error types shared by the engine.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod event;
pub mod role;
pub mod state;

pub use error::{LifecycleError, ScheduleError, SubsystemError, ThreadFailure};
pub use event::Event;
pub use role::Role;
pub use state::{transition, Effect, Effects, RunState, RunStateMachine, Transition};
