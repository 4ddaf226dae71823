use std::path::{Path, PathBuf};
use std::process::Command;

use crate::cmd;
use crate::error::{DeployError, DeployResult};
use crate::revision::{DiffEntry, Revision, RevisionProvider};

/// A local git working tree, queried through the system `git`
/// command.
#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    /// Open the repository whose top level is `path`.
    ///
    /// Diff and listing paths are relative to the repository root,
    /// and files are copied from `path`, so a subdirectory of a
    /// repository is rejected.
    pub fn open(path: &Path) -> DeployResult<Self> {
        let display = path.display().to_string();
        let toplevel = cmd::capture(
            Command::new("git")
                .arg("-C")
                .arg(path)
                .args(["rev-parse", "--show-toplevel"]),
        )
        .map_err(|_| DeployError::RepositoryNotFound(display.clone()))?;
        let toplevel = PathBuf::from(String::from_utf8_lossy(&toplevel).trim());

        let canonical = path.canonicalize()?;
        if toplevel.canonicalize()? != canonical {
            return Err(DeployError::Config(format!(
                "source path {display} is not the top level of repository {}",
                toplevel.display()
            )));
        }

        Ok(Self { root: canonical })
    }

    fn git(&self) -> Command {
        let mut command = Command::new("git");
        command.arg("-C").arg(&self.root);
        command
    }
}

impl RevisionProvider for GitRepository {
    fn resolve(&self, identifier: &str) -> DeployResult<Revision> {
        let resolution = |message: &str| DeployError::Resolution {
            identifier: identifier.to_string(),
            message: message.to_string(),
        };

        if identifier.is_empty() || identifier.starts_with('-') {
            return Err(resolution("not a revision identifier"));
        }

        let spec = format!("{identifier}^{{commit}}");
        let stdout = cmd::capture(
            self.git()
                .args(["rev-parse", "--verify", "--quiet"])
                .arg(&spec),
        )
        .map_err(|_| resolution("unknown revision"))?;

        let id = String::from_utf8_lossy(&stdout).trim().to_string();
        if id.is_empty() {
            return Err(resolution("unknown revision"));
        }
        Ok(Revision::new(&id))
    }

    fn head(&self) -> DeployResult<Revision> {
        self.resolve("HEAD")
    }

    fn diff(&self, from: &Revision, to: &Revision) -> DeployResult<Vec<DiffEntry>> {
        let stdout = cmd::capture(
            self.git()
                .args(["diff", "--name-status", "-z", "-M"])
                .arg(from.hex())
                .arg(to.hex()),
        )?;
        parse_name_status(&stdout)
    }

    fn list_files(&self, at: &Revision) -> DeployResult<Vec<String>> {
        let stdout = cmd::capture(
            self.git()
                .args(["ls-tree", "-r", "-z", "--full-tree"])
                .arg(at.hex()),
        )?;
        parse_ls_tree(&stdout)
    }
}

/// Split NUL-terminated `-z` output into its non-empty fields.
fn nul_fields(output: &[u8]) -> impl Iterator<Item = &[u8]> {
    output.split(|b| *b == 0).filter(|f| !f.is_empty())
}

/// Transports work on UTF-8 names; any other path is refused with
/// its bytes escaped.
fn utf8_path(raw: &[u8]) -> DeployResult<String> {
    String::from_utf8(raw.to_vec())
        .map_err(|_| DeployError::NonUtf8Path(raw.escape_ascii().to_string()))
}

/// Parse `git diff --name-status -z` output.
fn parse_name_status(output: &[u8]) -> DeployResult<Vec<DiffEntry>> {
    let mut fields = nul_fields(output);
    let mut entries = Vec::new();

    while let Some(raw_status) = fields.next() {
        let status = String::from_utf8_lossy(raw_status);
        let mut path = || {
            fields
                .next()
                .ok_or_else(|| {
                    DeployError::Other(format!("truncated diff entry for status {status}"))
                })
                .and_then(utf8_path)
        };
        let entry = match raw_status.first() {
            Some(b'A') => DiffEntry::Added(path()?),
            Some(b'M' | b'T') => DiffEntry::Modified(path()?),
            Some(b'D') => DiffEntry::Deleted(path()?),
            Some(b'R') => {
                let from = path()?;
                let to = path()?;
                DiffEntry::Renamed { from, to }
            }
            Some(b'C') => {
                let _source = path()?;
                DiffEntry::Added(path()?)
            }
            _ => {
                return Err(DeployError::Other(format!(
                    "unexpected diff status '{status}'"
                )));
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}

/// Parse `git ls-tree -r -z` output, keeping blobs and skipping
/// submodule entries.
fn parse_ls_tree(output: &[u8]) -> DeployResult<Vec<String>> {
    let mut files = Vec::new();

    for record in nul_fields(output) {
        let tab = record.iter().position(|b| *b == b'\t').ok_or_else(|| {
            DeployError::Other(format!(
                "malformed tree entry: {}",
                record.escape_ascii()
            ))
        })?;
        let (meta, path) = (&record[..tab], &record[tab + 1..]);
        if meta.split(|b| *b == b' ').nth(1) == Some(b"blob".as_slice()) {
            files.push(utf8_path(path)?);
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_status_covers_every_kind() {
        let raw = b"M\0a.txt\0D\0old.txt\0A\0b/c.txt\0R087\0x.txt\0y/x.txt\0T\0link\0";
        let entries = parse_name_status(raw).unwrap();

        assert_eq!(
            entries,
            vec![
                DiffEntry::Modified("a.txt".into()),
                DiffEntry::Deleted("old.txt".into()),
                DiffEntry::Added("b/c.txt".into()),
                DiffEntry::Renamed {
                    from: "x.txt".into(),
                    to: "y/x.txt".into(),
                },
                DiffEntry::Modified("link".into()),
            ]
        );
    }

    #[test]
    fn copy_becomes_add_of_destination() {
        let entries = parse_name_status(b"C100\0src.txt\0dst.txt\0").unwrap();
        assert_eq!(entries, vec![DiffEntry::Added("dst.txt".into())]);
    }

    #[test]
    fn paths_with_spaces_survive() {
        let entries = parse_name_status(b"A\0my file.txt\0").unwrap();
        assert_eq!(entries, vec![DiffEntry::Added("my file.txt".into())]);
    }

    #[test]
    fn truncated_rename_is_an_error() {
        assert!(parse_name_status(b"R100\0only-one\0").is_err());
    }

    #[test]
    fn empty_diff() {
        assert!(parse_name_status(b"").unwrap().is_empty());
    }

    #[test]
    fn non_utf8_path_is_refused_by_name() {
        let err = parse_name_status(b"A\0caf\xe9.txt\0").unwrap_err();

        assert!(matches!(err, DeployError::NonUtf8Path(ref p) if p == "caf\\xe9.txt"));
        assert_eq!(err.to_string(), "path is not valid UTF-8: caf\\xe9.txt");
    }

    #[test]
    fn non_utf8_rename_destination_is_refused() {
        let err = parse_name_status(b"R100\0a.txt\0caf\xe9.txt\0").unwrap_err();
        assert!(matches!(err, DeployError::NonUtf8Path(_)));
    }

    #[test]
    fn ls_tree_refuses_non_utf8_blob() {
        let raw = b"100644 blob e69de29bb2d1d6434b8b29ae775ad8c2e48c5391\tcaf\xe9.txt\0";
        let err = parse_ls_tree(raw).unwrap_err();

        assert!(matches!(err, DeployError::NonUtf8Path(ref p) if p == "caf\\xe9.txt"));
    }

    #[test]
    fn ls_tree_skips_submodules() {
        let raw = b"100644 blob e69de29bb2d1d6434b8b29ae775ad8c2e48c5391\ta.txt\0\
160000 commit 4b825dc642cb6eb9a060e54bf8d69288fbee4904\tvendor/lib\0\
100755 blob e69de29bb2d1d6434b8b29ae775ad8c2e48c5391\tb/run.sh\0";
        let files = parse_ls_tree(raw).unwrap();

        assert_eq!(files, vec!["a.txt".to_string(), "b/run.sh".to_string()]);
    }
}
