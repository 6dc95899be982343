//! Scenario loading errors.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use crate::document::DocumentKind;

/// Failure loading one of the scenario documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    /// The document's file does not exist.
    Missing {
        /// Which document.
        kind: DocumentKind,
        /// The path that was looked up.
        path: PathBuf,
    },
    /// The file exists but could not be read.
    Io {
        /// Which document.
        kind: DocumentKind,
        /// The path that was read.
        path: PathBuf,
        /// The OS error message.
        reason: String,
    },
    /// The document contains no records.
    Empty {
        /// Which document.
        kind: DocumentKind,
        /// The path that was read.
        path: PathBuf,
    },
}

impl ScenarioError {
    /// The document this error belongs to.
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Missing { kind, .. } | Self::Io { kind, .. } | Self::Empty { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { kind, path } => {
                write!(f, "{kind} file not found: {}", path.display())
            }
            Self::Io { kind, path, reason } => {
                write!(f, "cannot read {kind} file {}: {reason}", path.display())
            }
            Self::Empty { kind, path } => {
                write!(f, "{kind} file {} has no records", path.display())
            }
        }
    }
}

impl Error for ScenarioError {}
