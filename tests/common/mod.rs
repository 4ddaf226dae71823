#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use git_deploy::error::{DeployError, DeployResult};
use git_deploy::revision::{DiffEntry, Revision, RevisionProvider};

/// In-memory history: each commit is a full snapshot of
/// path -> content. Diffs are computed from the snapshots unless an
/// explicit diff was registered.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    commits: BTreeMap<String, BTreeMap<String, String>>,
    diffs: HashMap<(String, String), Vec<DiffEntry>>,
    head: Option<String>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit; the last one added becomes HEAD.
    pub fn commit(mut self, id: &str, files: &[(&str, &str)]) -> Self {
        let snapshot = files
            .iter()
            .map(|(p, c)| ((*p).to_string(), (*c).to_string()))
            .collect();
        self.commits.insert(id.to_string(), snapshot);
        self.head = Some(id.to_string());
        self
    }

    pub fn head_at(mut self, id: &str) -> Self {
        self.head = Some(id.to_string());
        self
    }

    pub fn with_diff(mut self, from: &str, to: &str, entries: Vec<DiffEntry>) -> Self {
        self.diffs.insert((from.to_string(), to.to_string()), entries);
        self
    }

    pub fn files(&self, id: &str) -> &BTreeMap<String, String> {
        &self.commits[id]
    }

    fn snapshot(&self, revision: &Revision) -> DeployResult<&BTreeMap<String, String>> {
        self.commits
            .get(revision.hex())
            .ok_or_else(|| DeployError::Other(format!("unknown commit {revision}")))
    }
}

impl RevisionProvider for MemoryHistory {
    fn resolve(&self, identifier: &str) -> DeployResult<Revision> {
        if self.commits.contains_key(identifier) {
            Ok(Revision::new(identifier))
        } else {
            Err(DeployError::Resolution {
                identifier: identifier.to_string(),
                message: "unknown revision".into(),
            })
        }
    }

    fn head(&self) -> DeployResult<Revision> {
        match &self.head {
            Some(id) => Ok(Revision::new(id)),
            None => Err(DeployError::Resolution {
                identifier: "HEAD".into(),
                message: "empty history".into(),
            }),
        }
    }

    fn diff(&self, from: &Revision, to: &Revision) -> DeployResult<Vec<DiffEntry>> {
        if let Some(entries) = self.diffs.get(&(from.hex().to_string(), to.hex().to_string())) {
            return Ok(entries.clone());
        }

        let old = self.snapshot(from)?;
        let new = self.snapshot(to)?;
        let mut entries = Vec::new();
        for (path, content) in new {
            match old.get(path) {
                None => entries.push(DiffEntry::Added(path.clone())),
                Some(previous) if previous != content => {
                    entries.push(DiffEntry::Modified(path.clone()));
                }
                Some(_) => {}
            }
        }
        for path in old.keys() {
            if !new.contains_key(path) {
                entries.push(DiffEntry::Deleted(path.clone()));
            }
        }
        Ok(entries)
    }

    fn list_files(&self, at: &Revision) -> DeployResult<Vec<String>> {
        Ok(self.snapshot(at)?.keys().cloned().collect())
    }
}

/// Write `files` under `root`, creating directories as needed.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

/// Write the working tree of `history` at `id` into `root`,
/// removing files the commit does not have.
pub fn checkout(history: &MemoryHistory, id: &str, root: &Path) {
    for entry in fs::read_dir(root).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            fs::remove_dir_all(path).unwrap();
        } else {
            fs::remove_file(path).unwrap();
        }
    }
    let files: Vec<(&str, &str)> = history
        .files(id)
        .iter()
        .map(|(p, c)| (p.as_str(), c.as_str()))
        .collect();
    write_tree(root, &files);
}

pub fn read(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join(name)).unwrap()
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
