pub mod local;
pub mod remote;

use std::fmt::Debug;
use std::path::Path;

use crate::config::{TargetDescriptor, TransportKind};
use crate::error::DeployResult;

pub use local::LocalTransport;
pub use remote::RemoteTransport;

/// File operations on one target root. All names are relative to
/// that root.
pub trait Transport: Send + Debug {
    /// Establish whatever session the transport needs.
    fn connect(&mut self) -> DeployResult<()>;

    /// Whether `name` exists at the target root.
    fn exists(&self, name: &str) -> bool;

    /// Read a small text file, with one trailing newline removed
    /// (see [`strip_trailing_newline`]).
    fn read_file(&self, name: &str) -> DeployResult<String>;

    /// Create or overwrite a file.
    fn write_file(&self, name: &str, contents: &[u8]) -> DeployResult<()>;

    /// Copy a local file to `name`, creating parent directories.
    fn copy_from(&self, name: &str, source: &Path) -> DeployResult<()>;

    /// Move `from` to `to` within the target root.
    fn rename(&self, from: &str, to: &str) -> DeployResult<()>;

    /// Remove a file. Removing a file that does not exist is an
    /// error.
    fn delete(&self, name: &str) -> DeployResult<()>;

    /// Close the session. Idempotent.
    fn disconnect(&mut self);
}

/// Build the transport a target descriptor asks for.
#[must_use]
pub fn for_descriptor(descriptor: &TargetDescriptor) -> Box<dyn Transport> {
    match descriptor.transport {
        TransportKind::Local => Box::new(LocalTransport::new(&descriptor.path)),
        TransportKind::Remote => Box::new(RemoteTransport::new(
            &descriptor.path,
            descriptor.credentials.clone(),
        )),
    }
}

/// Remove exactly one trailing `\n`, if present.
///
/// Marker files are written with a single newline terminator.
/// Content without one is returned unchanged, so a one-character
/// identifier is never truncated.
///
/// ```
/// use git_deploy::transport::strip_trailing_newline;
///
/// assert_eq!(strip_trailing_newline("abc\n".into()), "abc");
/// assert_eq!(strip_trailing_newline("a".into()), "a");
/// assert_eq!(strip_trailing_newline("a\n\n".into()), "a\n");
/// ```
#[must_use]
pub fn strip_trailing_newline(mut contents: String) -> String {
    if contents.ends_with('\n') {
        contents.pop();
    }
    contents
}
