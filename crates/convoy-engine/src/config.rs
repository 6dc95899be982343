//! Controller configuration, validation, and construction errors.
//!
//! [`ControllerConfig`] is plain data with defaults. [`validate()`]
//! runs before any scenario is loaded or thread is spawned, so a bad
//! configuration never leaves a half-built controller behind.
//!
//! [`validate()`]: ControllerConfig::validate

use std::error::Error;
use std::fmt;
use std::time::Duration;

use convoy_scenario::ScenarioError;

// ── ControllerConfig ─────────────────────────────────────────────

/// Configuration for [`Controller`](crate::Controller).
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// How long `end_threads` waits for each worker after cancelling it
    /// before reporting it as hung. Default: 1000.
    pub shutdown_grace_ms: u64,
    /// Event queue capacity. `None` = unbounded (default). With a limit,
    /// `schedule_event` fails with `Full` instead of blocking.
    pub queue_capacity: Option<usize>,
    /// How long a paused or finished worker parks between checks of its
    /// control flags. Default: 5.
    pub idle_park_ms: u64,
    /// Worker threads are named `<prefix>-model`, `<prefix>-view`,
    /// `<prefix>-timer`. Default: `"convoy"`.
    pub thread_name_prefix: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: 1000,
            queue_capacity: None,
            idle_park_ms: 5,
            thread_name_prefix: "convoy".into(),
        }
    }
}

impl ControllerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shutdown_grace_ms == 0 {
            return Err(ConfigError::InvalidGracePeriod {
                value: self.shutdown_grace_ms,
            });
        }
        if self.queue_capacity == Some(0) {
            return Err(ConfigError::QueueCapacityZero);
        }
        if self.idle_park_ms == 0 {
            return Err(ConfigError::InvalidIdlePark {
                value: self.idle_park_ms,
            });
        }
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::InvalidThreadPrefix {
                reason: "prefix is empty".into(),
            });
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(ConfigError::InvalidThreadPrefix {
                reason: "prefix contains a NUL byte".into(),
            });
        }
        Ok(())
    }

    /// Grace period as a `Duration`.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Idle park interval as a `Duration`.
    pub fn idle_park(&self) -> Duration {
        Duration::from_millis(self.idle_park_ms)
    }
}

// ── ConfigError ──────────────────────────────────────────────────

/// Errors that abort controller construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `shutdown_grace_ms` is zero.
    InvalidGracePeriod {
        /// The invalid value.
        value: u64,
    },
    /// `queue_capacity` is `Some(0)`.
    QueueCapacityZero,
    /// `idle_park_ms` is zero.
    InvalidIdlePark {
        /// The invalid value.
        value: u64,
    },
    /// `thread_name_prefix` cannot be used as a thread name.
    InvalidThreadPrefix {
        /// Why the prefix was rejected.
        reason: String,
    },
    /// A scenario document could not be loaded.
    Scenario(ScenarioError),
    /// The Model, View, or Timer could not be built from the scenario.
    Subsystem {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGracePeriod { value } => {
                write!(f, "shutdown_grace_ms must be positive, got {value}")
            }
            Self::QueueCapacityZero => write!(f, "queue_capacity must be at least 1"),
            Self::InvalidIdlePark { value } => {
                write!(f, "idle_park_ms must be positive, got {value}")
            }
            Self::InvalidThreadPrefix { reason } => {
                write!(f, "invalid thread_name_prefix: {reason}")
            }
            Self::Scenario(e) => write!(f, "scenario: {e}"),
            Self::Subsystem { reason } => write!(f, "cannot build subsystems: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Scenario(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScenarioError> for ConfigError {
    fn from(e: ScenarioError) -> Self {
        Self::Scenario(e)
    }
}
