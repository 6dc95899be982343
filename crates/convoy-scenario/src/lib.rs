//! Configuration loading for Convoy scenarios.
//!
//! A scenario is three documents (map, dispatcher, objects) read from the
//! application's working directory before the controller is constructed.
//! This crate owns the loader boundary and a format-agnostic record
//! reader; interpreting the records is left to the Model and View.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod document;
pub mod error;
pub mod loader;

pub use document::{ConfigDocument, DocumentKind, Record};
pub use error::ScenarioError;
pub use loader::{DirectoryLoader, Scenario, ScenarioLoader};
