//! Loader boundary for the three scenario documents.
//!
//! Loading happens once, before the controller is constructed. Any error
//! here aborts construction; no worker thread exists yet.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::{ConfigDocument, DocumentKind};
use crate::error::ScenarioError;

/// The three documents a simulation is built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scenario {
    /// Application working directory the documents were loaded from.
    pub root: PathBuf,
    /// Map layout.
    pub map: ConfigDocument,
    /// Dispatcher and camera setup.
    pub dispatcher: ConfigDocument,
    /// Object (voyager) definitions.
    pub objects: ConfigDocument,
}

impl Scenario {
    /// The document of the given kind.
    pub fn document(&self, kind: DocumentKind) -> &ConfigDocument {
        match kind {
            DocumentKind::Map => &self.map,
            DocumentKind::Dispatcher => &self.dispatcher,
            DocumentKind::Objects => &self.objects,
        }
    }
}

/// Source of scenario documents.
///
/// The three loaders are independent; [`load`](ScenarioLoader::load)
/// runs them in order and stops at the first failure.
pub trait ScenarioLoader {
    /// Load the map document.
    fn load_map(&self, root: &Path) -> Result<ConfigDocument, ScenarioError>;

    /// Load the dispatcher/camera document.
    fn load_dispatcher(&self, root: &Path) -> Result<ConfigDocument, ScenarioError>;

    /// Load the object/voyager document.
    fn load_objects(&self, root: &Path) -> Result<ConfigDocument, ScenarioError>;

    /// Load all three documents.
    fn load(&self, root: &Path) -> Result<Scenario, ScenarioError> {
        Ok(Scenario {
            root: root.to_path_buf(),
            map: self.load_map(root)?,
            dispatcher: self.load_dispatcher(root)?,
            objects: self.load_objects(root)?,
        })
    }
}

/// Reads the documents from files in the application's working directory.
#[derive(Clone, Debug)]
pub struct DirectoryLoader {
    map_file: String,
    dispatcher_file: String,
    objects_file: String,
    allow_empty: bool,
}

impl Default for DirectoryLoader {
    fn default() -> Self {
        Self {
            map_file: "map.cfg".into(),
            dispatcher_file: "dispatcher.cfg".into(),
            objects_file: "objects.cfg".into(),
            allow_empty: false,
        }
    }
}

impl DirectoryLoader {
    /// Loader using `map.cfg`, `dispatcher.cfg` and `objects.cfg`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the file name used for `kind`.
    pub fn with_file_name(mut self, kind: DocumentKind, name: impl Into<String>) -> Self {
        let name = name.into();
        match kind {
            DocumentKind::Map => self.map_file = name,
            DocumentKind::Dispatcher => self.dispatcher_file = name,
            DocumentKind::Objects => self.objects_file = name,
        }
        self
    }

    /// Accept documents with no records instead of failing.
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    /// Full path of the `kind` document under `root`.
    pub fn path_for(&self, root: &Path, kind: DocumentKind) -> PathBuf {
        let name = match kind {
            DocumentKind::Map => &self.map_file,
            DocumentKind::Dispatcher => &self.dispatcher_file,
            DocumentKind::Objects => &self.objects_file,
        };
        root.join(name)
    }

    fn read(&self, root: &Path, kind: DocumentKind) -> Result<ConfigDocument, ScenarioError> {
        let path = self.path_for(root, kind);
        let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ScenarioError::Missing {
                kind,
                path: path.clone(),
            },
            _ => ScenarioError::Io {
                kind,
                path: path.clone(),
                reason: e.to_string(),
            },
        })?;

        let doc = ConfigDocument::parse(kind, &path, &text);
        if doc.is_empty() && !self.allow_empty {
            return Err(ScenarioError::Empty { kind, path });
        }
        debug!(kind = %kind, path = %path.display(), records = doc.len(), "loaded scenario document");
        Ok(doc)
    }
}

impl ScenarioLoader for DirectoryLoader {
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
