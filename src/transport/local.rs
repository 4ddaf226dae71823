use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{DeployError, DeployResult};
use crate::transport::{Transport, strip_trailing_newline};

/// A target directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalTransport {
    root: PathBuf,
}

impl LocalTransport {
    #[must_use]
    pub fn new(root: &str) -> Self {
        Self {
            root: PathBuf::from(root),
        }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn display(&self, name: &str) -> String {
        self.resolve(name).display().to_string()
    }
}

fn create_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

impl Transport for LocalTransport {
    fn connect(&mut self) -> DeployResult<()> {
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).exists()
    }

    fn read_file(&self, name: &str) -> DeployResult<String> {
        fs::read_to_string(self.resolve(name))
            .map(strip_trailing_newline)
            .map_err(|e| DeployError::read(self.display(name), e))
    }

    // The root itself is never created: a missing local target
    // fails here and is reported instead of appearing from nowhere.
    fn write_file(&self, name: &str, contents: &[u8]) -> DeployResult<()> {
        fs::write(self.resolve(name), contents).map_err(|e| DeployError::write(self.display(name), e))
    }

    fn copy_from(&self, name: &str, source: &Path) -> DeployResult<()> {
        let read_error = |e: io::Error| DeployError::read(source.display().to_string(), e);
        let mut input = File::open(source).map_err(read_error)?;
        let permissions = input.metadata().map_err(read_error)?.permissions();

        let dest = self.resolve(name);
        create_parent(&dest)
            .and_then(|()| File::create(&dest))
            .and_then(|mut output| {
                io::copy(&mut input, &mut output)?;
                output.set_permissions(permissions)
            })
            .map_err(|e| DeployError::write(self.display(name), e))
    }

    fn rename(&self, from: &str, to: &str) -> DeployResult<()> {
        let dest = self.resolve(to);
        create_parent(&dest)
            .and_then(|()| fs::rename(self.resolve(from), &dest))
            .map_err(|e| DeployError::write(self.display(to), e))
    }

    fn delete(&self, name: &str) -> DeployResult<()> {
        fs::remove_file(self.resolve(name)).map_err(|e| DeployError::delete(self.display(name), e))
    }

    fn disconnect(&mut self) {}
}
