//! Test utilities and mock types for Convoy development.
//!
//! Provides subsystem fixtures (see [`fixtures`]), an in-memory
//! [`MockLoader`] for scenario documents, and [`counting_trio`] for the
//! common case of three observable subsystems.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use convoy_engine::Subsystems;
use convoy_scenario::{ConfigDocument, DocumentKind, ScenarioError, ScenarioLoader};

pub use fixtures::{
    CountingSubsystem, FailingSubsystem, HangingSubsystem, PanickingSubsystem, Tally, TickTimer,
};

/// Tallies for the three subsystems built by [`counting_trio`].
#[derive(Clone, Debug)]
pub struct Tallies {
    pub model: Arc<Tally>,
    pub view: Arc<Tally>,
    pub timer: Arc<Tally>,
}

/// Three [`CountingSubsystem`]s that never finish and never schedule.
pub fn counting_trio() -> (Subsystems, Tallies) {
    let model = CountingSubsystem::new("model");
    let view = CountingSubsystem::new("view");
    let timer = CountingSubsystem::new("timer").step_delay(Duration::from_millis(2));
    let tallies = Tallies {
        model: model.tally(),
        view: view.tally(),
        timer: timer.tally(),
    };
    (Subsystems::new(model, view, timer), tallies)
}

/// In-memory [`ScenarioLoader`].
///
/// Documents are registered as text with [`with_document`]; a kind
/// without a document fails with [`ScenarioError::Missing`].
///
/// [`with_document`]: MockLoader::with_document
#[derive(Debug, Default)]
pub struct MockLoader {
    documents: HashMap<DocumentKind, String>,
    loads: AtomicUsize,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader with a small valid document of every kind.
    pub fn complete() -> Self {
        Self::new()
            .with_document(DocumentKind::Map, "node a 0 0\nnode b 10 0\nedge a b\n")
            .with_document(DocumentKind::Dispatcher, "camera c1 a\n")
            .with_document(DocumentKind::Objects, "voyager v1 a b 2.5\n")
    }

    pub fn with_document(mut self, kind: DocumentKind, text: impl Into<String>) -> Self {
        self.documents.insert(kind, text.into());
        self
    }

    pub fn without_document(mut self, kind: DocumentKind) -> Self {
        self.documents.remove(&kind);
        self
    }

    /// Documents successfully returned so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Acquire)
    }

    fn read(&self, root: &Path, kind: DocumentKind) -> Result<ConfigDocument, ScenarioError> {
        let path = root.join(format!("{}.cfg", kind.name()));
        let text = self
            .documents
            .get(&kind)
            .ok_or_else(|| ScenarioError::Missing {
                kind,
                path: path.clone(),
            })?;
        self.loads.fetch_add(1, Ordering::AcqRel);
        Ok(ConfigDocument::parse(kind, path, text))
    }
}

impl ScenarioLoader for MockLoader {
    fn load_map(&self, root: &Path) -> Result<ConfigDocument, ScenarioError> {
        self.read(root, DocumentKind::Map)
    }

    fn load_dispatcher(&self, root: &Path) -> Result<ConfigDocument, ScenarioError> {
        self.read(root, DocumentKind::Dispatcher)
    }

    fn load_objects(&self, root: &Path) -> Result<ConfigDocument, ScenarioError> {
        self.read(root, DocumentKind::Objects)
    }
}
