use std::path::Path;

use log::{debug, info, warn};

use crate::config::TargetDescriptor;
use crate::error::{DeployError, DeployResult};
use crate::revision::{DiffEntry, Revision, RevisionProvider};
use crate::transport::{self, Transport};

/// Sentinel file whose presence means a deploy is in progress.
pub const LOCK_MARKER: &str = ".git_lock";

/// File holding the hex id of the last revision deployed.
pub const COMMIT_MARKER: &str = ".git_commit";

const LOCK_CONTENT: &[u8] = b"locked\n";

/// Where a target is in its lifecycle during one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Unconnected,
    Connected,
    Locked,
    Deployed,
    Aborted,
}

/// Whether a deploy sends a diff or the whole tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    Incremental,
    Full,
}

/// The work a deploy will do on one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployPlan {
    /// Apply the changes between the recorded commit and the
    /// desired revision.
    Incremental {
        from: Revision,
        entries: Vec<DiffEntry>,
    },
    /// No usable baseline: copy every file at the desired
    /// revision.
    Full { files: Vec<String> },
}

impl DeployPlan {
    #[must_use]
    pub const fn mode(&self) -> DeployMode {
        match self {
            Self::Incremental { .. } => DeployMode::Incremental,
            Self::Full { .. } => DeployMode::Full,
        }
    }

    /// Number of file operations the plan will perform.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Incremental { entries, .. } => entries.len(),
            Self::Full { files } => files.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One deployment destination: a transport, the path it serves,
/// and what this run knows about its lock and commit markers.
#[derive(Debug)]
pub struct Target {
    path: String,
    transport: Box<dyn Transport>,
    last_known_commit: Option<Revision>,
    lock_held: bool,
    state: TargetState,
}

impl Target {
    #[must_use]
    pub fn new(descriptor: &TargetDescriptor) -> Self {
        Self::with_transport(&descriptor.path, transport::for_descriptor(descriptor))
    }

    #[must_use]
    pub fn with_transport(path: &str, transport: Box<dyn Transport>) -> Self {
        Self {
            path: path.to_string(),
            transport,
            last_known_commit: None,
            lock_held: false,
            state: TargetState::Unconnected,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub const fn state(&self) -> TargetState {
        self.state
    }

    /// Whether this run created the lock marker.
    #[must_use]
    pub const fn lock_held(&self) -> bool {
        self.lock_held
    }

    #[must_use]
    pub const fn last_known_commit(&self) -> Option<&Revision> {
        self.last_known_commit.as_ref()
    }

    pub fn connect(&mut self) -> DeployResult<()> {
        self.transport.connect()?;
        if self.state == TargetState::Unconnected {
            self.state = TargetState::Connected;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.transport.exists(LOCK_MARKER)
    }

    /// Write the lock marker. Returns `false` if it cannot be
    /// written.
    ///
    /// Checking for an existing marker and writing a new one are
    /// two separate transport calls, so two runs racing on the same
    /// target can both succeed here. The lock is advisory.
    pub fn lock(&mut self) -> bool {
        match self.transport.write_file(LOCK_MARKER, LOCK_CONTENT) {
            Ok(()) => {
                self.lock_held = true;
                self.state = TargetState::Locked;
                true
            }
            Err(e) => {
                warn!("unable to lock {}: {e}", self.path);
                false
            }
        }
    }

    /// Read the commit marker without resolving it.
    #[must_use]
    pub fn recorded_commit(&self) -> Option<String> {
        if !self.transport.exists(COMMIT_MARKER) {
            return None;
        }
        match self.transport.read_file(COMMIT_MARKER) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("unable to read commit marker of {}: {e}", self.path);
                None
            }
        }
    }

    /// Check that the commit marker names a revision the provider
    /// knows, caching it as the diff baseline on success.
    pub fn validate_commit(&mut self, provider: &dyn RevisionProvider) -> bool {
        let Some(id) = self.recorded_commit() else {
            debug!("{} has no commit marker", self.path);
            return false;
        };
        match provider.resolve(&id) {
            Ok(revision) => {
                debug!("{} is at {revision}", self.path);
                self.last_known_commit = Some(revision);
                true
            }
            Err(e) => {
                warn!("{} records an unusable commit: {e}", self.path);
                false
            }
        }
    }

    /// Work needed to bring this target to `desired`.
    pub fn plan(
        &self,
        desired: &Revision,
        provider: &dyn RevisionProvider,
    ) -> DeployResult<DeployPlan> {
        match &self.last_known_commit {
            Some(from) => Ok(DeployPlan::Incremental {
                from: from.clone(),
                entries: provider.diff(from, desired)?,
            }),
            None => Ok(DeployPlan::Full {
                files: provider.list_files(desired)?,
            }),
        }
    }

    /// Bring the target to `desired`, then record it in the commit
    /// marker and release the lock.
    ///
    /// Any transport failure stops the deploy. Files already
    /// written are left in place and the lock is kept so an
    /// operator can inspect the target.
    pub fn deploy(
        &mut self,
        desired: &Revision,
        provider: &dyn RevisionProvider,
        source: &Path,
    ) -> DeployResult<DeployPlan> {
        if !self.lock_held {
            return Err(DeployError::Other(format!(
                "{} is not locked by this run",
                self.path
            )));
        }

        let plan = self.plan(desired, provider)?;
        info!(
            "deploying {} ({} files, {:?}) to {}",
            desired,
            plan.len(),
            plan.mode(),
            self.path
        );

        match &plan {
            DeployPlan::Incremental { entries, .. } => {
                for entry in entries {
                    self.apply(entry, source)?;
                }
            }
            DeployPlan::Full { files } => {
                for file in files {
                    self.transport.copy_from(file, &source.join(file))?;
                }
            }
        }

        let marker = format!("{}\n", desired.hex());
        self.transport.write_file(COMMIT_MARKER, marker.as_bytes())?;
        self.unlock()?;

        self.last_known_commit = Some(desired.clone());
        self.state = TargetState::Deployed;
        Ok(plan)
    }

    fn apply(&self, entry: &DiffEntry, source: &Path) -> DeployResult<()> {
        debug!("{}: {entry}", self.path);
        match entry {
            DiffEntry::Deleted(path) => self.transport.delete(path),
            DiffEntry::Renamed { from, to } => {
                self.transport.rename(from, to)?;
                // a rename may carry content changes as well
                self.transport.copy_from(to, &source.join(to))
            }
            DiffEntry::Added(path) | DiffEntry::Modified(path) => {
                self.transport.copy_from(path, &source.join(path))
            }
        }
    }

    /// Remove the lock marker. A marker that is already gone is
    /// not an error.
    fn unlock(&mut self) -> DeployResult<()> {
        if self.transport.exists(LOCK_MARKER) {
            self.transport.delete(LOCK_MARKER)?;
        }
        self.lock_held = false;
        Ok(())
    }

    /// Release this run's lock (if it holds one) and close the
    /// transport. Never fails; problems are logged.
    pub fn abort(&mut self) {
        if self.lock_held {
            if let Err(e) = self.unlock() {
                warn!("unable to unlock {}: {e}", self.path);
            }
        }
        self.transport.disconnect();
        self.state = TargetState::Aborted;
    }

    /// Close the transport without touching any marker.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
    }
}
