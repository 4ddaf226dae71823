//! Incremental git deploys to local and SSH targets.
//!
//! `git-deploy` keeps a set of target directories in sync with a
//! revision of a local git repository. Each target records the
//! last revision it received, so later deploys only send the files
//! that changed.
//!
//! # Overview
//!
//! A deploy is driven by an [`Orchestrator`] that wires together:
//!
//! - A [`Config`] naming the source repository and the targets
//! - A [`RevisionProvider`](revision::RevisionProvider) for the
//!   history (e.g. [`GitRepository`])
//! - One [`Target`] per destination, each owning a
//!   [`Transport`](transport::Transport) ([`LocalTransport`] or
//!   [`RemoteTransport`] over SSH)
//!
//! # State kept on each target
//!
//! Two files live at the root of every target:
//!
//! - `.git_lock` - present while a deploy is in progress. A target
//!   that already has one is never deployed to.
//! - `.git_commit` - the hex id of the last revision deployed,
//!   followed by a newline. Without it (or if it names an unknown
//!   revision) the run refuses to deploy unless it is a hard deploy,
//!   which copies the whole tree.
//!
//! The lock is advisory: checking for the marker and writing it are
//! separate steps, and two runs racing on one target can both take
//! it.
//!
//! # Phases
//!
//! 1. **Lock** every target. If any is already locked or cannot be
//!    locked, the locks this run took are released and nothing is
//!    deployed.
//! 2. **Validate** every target's commit marker (skipped for a hard
//!    deploy), aborting the same way if one is unusable.
//! 3. **Deploy** to each target independently. A failing target is
//!    left locked for an operator; the others still deploy.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use git_deploy::{Config, GitRepository, Orchestrator};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Path::new("git_deploy.config"))?;
//!     let repo = GitRepository::open(Path::new(&config.source_path))?;
//!
//!     let report = Orchestrator::new(config, Arc::new(repo))
//!         .jobs(4)
//!         .run(None)?;
//!
//!     print!("{}", report.render());
//!     Ok(())
//! }
//! ```

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod git;
pub mod orchestrator;
pub mod report;
pub mod revision;
pub mod ssh;
pub mod target;
pub mod transport;

pub use config::{Config, Credentials, TargetDescriptor, TransportKind};
pub use error::{DeployError, DeployResult};
pub use git::GitRepository;
pub use orchestrator::Orchestrator;
pub use report::{DeployReport, DryRunReport, TargetOutcome};
pub use revision::{DiffEntry, Revision, RevisionProvider};
pub use target::{COMMIT_MARKER, DeployMode, DeployPlan, LOCK_MARKER, Target, TargetState};
pub use transport::{LocalTransport, RemoteTransport};
