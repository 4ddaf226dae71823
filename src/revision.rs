use std::fmt;

use crate::error::DeployResult;

/// An immutable point in the source history, identified by its
/// full hex id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision {
    id: String,
}

impl Revision {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }

    #[must_use]
    pub fn hex(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// One file-level change between two revisions. Paths are relative
/// to the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEntry {
    Added(String),
    Modified(String),
    Deleted(String),
    Renamed { from: String, to: String },
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added(p) => write!(f, "A {p}"),
            Self::Modified(p) => write!(f, "M {p}"),
            Self::Deleted(p) => write!(f, "D {p}"),
            Self::Renamed { from, to } => write!(f, "R {from} -> {to}"),
        }
    }
}

/// Source of revision history: resolves identifiers and describes
/// what changed between two revisions.
pub trait RevisionProvider: Send + Sync {
    /// Resolve an identifier (full or abbreviated id, branch, tag)
    /// to a revision. Unknown identifiers yield
    /// [`DeployError::Resolution`](crate::error::DeployError::Resolution).
    fn resolve(&self, identifier: &str) -> DeployResult<Revision>;

    /// The revision currently checked out in the source tree.
    fn head(&self) -> DeployResult<Revision>;

    /// File-level changes taking `from` to `to`.
    fn diff(&self, from: &Revision, to: &Revision) -> DeployResult<Vec<DiffEntry>>;

    /// Every tracked file at `at`.
    fn list_files(&self, at: &Revision) -> DeployResult<Vec<String>>;
}
