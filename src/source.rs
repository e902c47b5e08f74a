//! Source texts, identifiers and positions

use crate::checksum::Checksum;
use crate::version::Revision;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Position of a statement inside a source file.
///
/// Lines are one-based, columns zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub file: Arc<str>,
    pub line: usize,
    pub column: usize,
}

impl SourceRef {
    pub fn new(file: impl Into<Arc<str>>, line: usize, column: usize) -> Self {
        Self { file: file.into(), line, column }
    }

    /// Location used for statements synthesized by the compiler itself
    pub fn builtin() -> Self {
        Self::new("<builtin>", 0, 0)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Identity of a compilation unit: module or submodule name, revision and
/// optional semantic version. Equal identifiers denote the same unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceIdentifier {
    pub name: String,
    pub revision: Option<Revision>,
    pub semver: Option<Version>,
}

impl SourceIdentifier {
    pub fn new(name: impl Into<String>, revision: Option<Revision>) -> Self {
        Self { name: name.into(), revision, semver: None }
    }

    pub fn with_semver(mut self, semver: Option<Version>) -> Self {
        self.semver = semver;
        self
    }
}

impl fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(rev) = &self.revision {
            write!(f, "@{}", rev)?;
        }
        if let Some(semver) = &self.semver {
            write!(f, "#{}", semver)?;
        }
        Ok(())
    }
}

/// Raw YANG text together with the name used in diagnostics
#[derive(Debug, Clone)]
pub struct YangTextSource {
    name: Arc<str>,
    text: String,
}

impl YangTextSource {
    pub fn new(name: impl Into<Arc<str>>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }

    /// Read a source from disk; the file name becomes the diagnostic name
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(path.display().to_string(), text))
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn checksum(&self) -> Checksum {
        Checksum::from_str(&self.text)
    }
}
