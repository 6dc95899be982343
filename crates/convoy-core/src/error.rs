//! Error types shared across the Convoy workspace.
//!
//! Organized by where the failure is observed: inside a subsystem step,
//! when scheduling an event, when starting worker threads, and when
//! stopping them.

use std::error::Error;
use std::fmt;

use crate::role::Role;

/// Failure raised by a Model, View, or Timer while stepping or resetting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubsystemError {
    /// The step could not complete.
    StepFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The subsystem could not return to its initial state.
    ResetFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl SubsystemError {
    /// Shorthand for [`SubsystemError::StepFailed`].
    pub fn step(reason: impl Into<String>) -> Self {
        Self::StepFailed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SubsystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepFailed { reason } => write!(f, "step failed: {reason}"),
            Self::ResetFailed { reason } => write!(f, "reset failed: {reason}"),
        }
    }
}

impl Error for SubsystemError {}

/// Error returned to a producer by `schedule_event`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// The controller has closed its queue; the event was not accepted.
    Closed,
    /// The bounded queue is at capacity (back-pressure).
    Full,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "controller is closed"),
            Self::Full => write!(f, "event queue full"),
        }
    }
}

impl Error for ScheduleError {}

/// Error starting worker threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    /// `run_threads` was called while threads are running.
    AlreadyStarted,
    /// `run_threads` was called after the threads were ended.
    AlreadyEnded,
    /// The OS refused to spawn a thread.
    SpawnFailed {
        /// The worker that could not be spawned.
        role: Role,
        /// The OS error message.
        reason: String,
    },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyStarted => write!(f, "worker threads already started"),
            Self::AlreadyEnded => write!(f, "worker threads already ended"),
            Self::SpawnFailed { role, reason } => {
                write!(f, "failed to spawn {role} thread: {reason}")
            }
        }
    }
}

impl Error for LifecycleError {}

/// A worker thread that did not shut down cleanly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThreadFailure {
    /// The thread ignored cancellation for longer than the grace period.
    /// Its handle was abandoned.
    Timeout {
        /// The hung worker.
        role: Role,
        /// The grace period that elapsed, in milliseconds.
        grace_ms: u64,
    },
    /// The thread panicked.
    Panicked {
        /// The worker that panicked.
        role: Role,
        /// The panic message, when it was a string.
        message: String,
    },
    /// The subsystem returned an error and the thread exited early.
    Faulted {
        /// The worker that faulted.
        role: Role,
        /// The error the subsystem returned.
        error: SubsystemError,
    },
}

impl ThreadFailure {
    /// The worker this failure belongs to.
    pub fn role(&self) -> Role {
        match self {
            Self::Timeout { role, .. } | Self::Panicked { role, .. } | Self::Faulted { role, .. } => {
                *role
            }
        }
    }
}

impl fmt::Display for ThreadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { role, grace_ms } => {
                write!(f, "{role} thread did not stop within {grace_ms}ms")
            }
            Self::Panicked { role, message } => write!(f, "{role} thread panicked: {message}"),
            Self::Faulted { role, error } => write!(f, "{role} thread faulted: {error}"),
        }
    }
}

impl Error for ThreadFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Faulted { error, .. } => Some(error),
            _ => None,
        }
    }
}
