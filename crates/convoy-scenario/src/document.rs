//! Format-agnostic record reader for configuration documents.
//!
//! A document is a sequence of records, one per non-blank line. Text after
//! `#` is a comment. Each record is split on whitespace; what the fields
//! mean is up to whoever consumes the scenario.

use std::fmt;
use std::path::{Path, PathBuf};

/// Which of the three scenario documents this is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Map layout.
    Map,
    /// Dispatcher and camera setup.
    Dispatcher,
    /// Object (voyager) definitions.
    Objects,
}

impl DocumentKind {
    /// Every kind, in load order.
    pub const ALL: [DocumentKind; 3] = [Self::Map, Self::Dispatcher, Self::Objects];

    /// Lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Dispatcher => "dispatcher",
            Self::Objects => "objects",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One non-blank, non-comment line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the source file.
    pub line: usize,
    /// Whitespace-separated fields. Never empty.
    pub fields: Vec<String>,
}

impl Record {
    /// First field, conventionally the record's keyword.
    pub fn keyword(&self) -> &str {
        &self.fields[0]
    }

    /// Fields after the keyword.
    pub fn args(&self) -> &[String] {
        &self.fields[1..]
    }
}

/// A parsed configuration document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigDocument {
    /// Which document this is.
    pub kind: DocumentKind,
    /// Where it was read from.
    pub path: PathBuf,
    /// Records in file order.
    pub records: Vec<Record>,
}

impl ConfigDocument {
    /// Split `text` into records.
    pub fn parse(kind: DocumentKind, path: impl Into<PathBuf>, text: &str) -> Self {
        let records = text
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let content = match raw.find('#') {
                    Some(pos) => &raw[..pos],
                    None => raw,
                };
                let fields: Vec<String> = content.split_whitespace().map(str::to_owned).collect();
                if fields.is_empty() {
                    None
                } else {
                    Some(Record { line: i + 1, fields })
                }
            })
            .collect();
        Self {
            kind,
            path: path.into(),
            records,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the document has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose keyword is `keyword`.
    pub fn with_keyword<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| r.keyword() == keyword)
    }

    /// The file this document came from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
