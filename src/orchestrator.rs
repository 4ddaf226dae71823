use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::runtime::{Builder, Runtime};

use crate::config::Config;
use crate::error::{DeployError, DeployResult};
use crate::report::{DeployReport, DryRunReport, TargetOutcome, TargetPreview};
use crate::revision::{Revision, RevisionProvider};
use crate::target::Target;

/// Default number of targets worked on at once.
pub const DEFAULT_JOBS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockStatus {
    Locked,
    AlreadyLocked,
    CannotLock,
}

/// Drives one deploy run across every configured target.
///
/// A run moves through three phases, each finishing on every
/// target before the next starts:
///
/// 1. **Lock** - connect and write the lock marker. If any target
///    is already locked or cannot be locked, every lock taken by
///    this run is released and nothing is deployed.
/// 2. **Validate** - check each target's commit marker (skipped for
///    a hard deploy). Any target without a usable marker aborts the
///    run the same way.
/// 3. **Deploy** - bring each target to the desired revision. A
///    failure here is confined to its target.
pub struct Orchestrator {
    config: Config,
    provider: Arc<dyn RevisionProvider>,
    hard: bool,
    jobs: usize,
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: Config, provider: Arc<dyn RevisionProvider>) -> Self {
        Self {
            config,
            provider,
            hard: false,
            jobs: DEFAULT_JOBS,
        }
    }

    /// Skip commit validation and send the full tree to every
    /// target.
    #[must_use]
    pub const fn hard(mut self, hard: bool) -> Self {
        self.hard = hard;
        self
    }

    /// Upper bound on targets processed concurrently. Zero is
    /// treated as one.
    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Deploy `revision` (or the source tree's HEAD) to every
    /// target.
    ///
    /// Returns `Err` when the run stops before the deploy phase;
    /// otherwise the report carries each target's outcome.
    pub fn run(&self, revision: Option<&str>) -> DeployResult<DeployReport> {
        let desired = self.resolve(revision)?;
        let runtime = self.runtime()?;
        let targets: Vec<Target> = self.config.targets.iter().map(Target::new).collect();

        info!("locking {} targets", targets.len());
        let targets = Self::lock_all(&runtime, targets)?;

        let targets = if self.hard {
            warn!("hard deploy: recorded commits are ignored");
            targets
        } else {
            self.validate_all(&runtime, targets)?
        };

        let provider = Arc::clone(&self.provider);
        let source = PathBuf::from(&self.config.source_path);
        let deploy_to = desired.clone();
        let results = each(&runtime, targets, move |target| {
            let result = target.deploy(&deploy_to, provider.as_ref(), &source);
            target.disconnect();
            result
        });

        let outcomes = results
            .into_iter()
            .map(|(target, result)| match result {
                Ok(plan) => TargetOutcome {
                    path: target.path().to_string(),
                    mode: Some(plan.mode()),
                    files: plan.len(),
                    error: None,
                },
                Err(e) => {
                    warn!("deploy to {} failed: {e}", target.path());
                    TargetOutcome {
                        path: target.path().to_string(),
                        mode: None,
                        files: 0,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        Ok(DeployReport {
            revision: desired,
            outcomes,
        })
    }

    /// Report what [`run`](Self::run) would do without locking or
    /// writing anything.
    pub fn dry_run(&self, revision: Option<&str>) -> DeployResult<DryRunReport> {
        let desired = self.resolve(revision)?;
        let runtime = self.runtime()?;
        let targets: Vec<Target> = self.config.targets.iter().map(Target::new).collect();

        let provider = Arc::clone(&self.provider);
        let hard = self.hard;
        let preview_of = desired.clone();
        let results = each(&runtime, targets, move |target| {
            let preview = preview(target, &preview_of, provider.as_ref(), hard);
            target.disconnect();
            preview
        });

        Ok(DryRunReport {
            revision: desired,
            targets: results.into_iter().map(|(_, preview)| preview).collect(),
        })
    }

    fn resolve(&self, revision: Option<&str>) -> DeployResult<Revision> {
        let Some(id) = revision else {
            return self.provider.head();
        };
        let desired = self.provider.resolve(id)?;

        match self.provider.head() {
            Ok(head) if head != desired => warn!(
                "deploying {desired} but the source tree is at {head}; \
                 files are copied from the working tree"
            ),
            Ok(_) => {}
            Err(e) => debug!("unable to read source HEAD: {e}"),
        }
        Ok(desired)
    }

    fn runtime(&self) -> DeployResult<Runtime> {
        Ok(Builder::new_current_thread()
            .max_blocking_threads(self.jobs)
            .build()?)
    }

    fn lock_all(runtime: &Runtime, targets: Vec<Target>) -> DeployResult<Vec<Target>> {
        let results = each(runtime, targets, |target| {
            if let Err(e) = target.connect() {
                warn!("{e}");
                return LockStatus::CannotLock;
            }
            if target.is_locked() {
                LockStatus::AlreadyLocked
            } else if target.lock() {
                LockStatus::Locked
            } else {
                LockStatus::CannotLock
            }
        });

        let paths_with = |status: LockStatus| -> Vec<String> {
            results
                .iter()
                .filter(|(_, s)| *s == status)
                .map(|(t, _)| t.path().to_string())
                .collect()
        };
        let already_locked = paths_with(LockStatus::AlreadyLocked);
        let cannot_lock = paths_with(LockStatus::CannotLock);

        let targets = results.into_iter().map(|(t, _)| t).collect();
        if already_locked.is_empty() && cannot_lock.is_empty() {
            return Ok(targets);
        }

        abort_all(targets);
        Err(DeployError::LockFailed {
            already_locked,
            cannot_lock,
        })
    }

    fn validate_all(&self, runtime: &Runtime, targets: Vec<Target>) -> DeployResult<Vec<Target>> {
        let provider = Arc::clone(&self.provider);
        let results = each(runtime, targets, move |target| {
            target.validate_commit(provider.as_ref())
        });

        let invalid: Vec<String> = results
            .iter()
            .filter(|(_, valid)| !valid)
            .map(|(t, _)| t.path().to_string())
            .collect();

        let targets = results.into_iter().map(|(t, _)| t).collect();
        if invalid.is_empty() {
            return Ok(targets);
        }

        abort_all(targets);
        Err(DeployError::Validation(invalid))
    }
}

fn preview(
    target: &mut Target,
    desired: &Revision,
    provider: &dyn RevisionProvider,
    hard: bool,
) -> TargetPreview {
    let path = target.path().to_string();
    if let Err(e) = target.connect() {
        return TargetPreview {
            path,
            locked: false,
            recorded_commit: None,
            plan: Err(e.to_string()),
        };
    }

    let locked = target.is_locked();
    let recorded_commit = target.recorded_commit();
    if !hard && !target.validate_commit(provider) {
        return TargetPreview {
            path,
            locked,
            recorded_commit,
            plan: Err("invalid or missing commit information".into()),
        };
    }

    TargetPreview {
        path,
        locked,
        recorded_commit,
        plan: target.plan(desired, provider).map_err(|e| e.to_string()),
    }
}

/// Release every lock this run holds and close all transports.
fn abort_all(targets: Vec<Target>) {
    for mut target in targets {
        target.abort();
    }
}

/// Run `task` on every target on the runtime's blocking pool and
/// wait for all of them. Results come back in input order.
fn each<T, F>(runtime: &Runtime, targets: Vec<Target>, task: F) -> Vec<(Target, T)>
where
    F: Fn(&mut Target) -> T + Send + Sync + 'static,
    T: Send + 'static,
{
    let task = Arc::new(task);
    let handles: Vec<_> = targets
        .into_iter()
        .map(|mut target| {
            let task = Arc::clone(&task);
            runtime.spawn_blocking(move || {
                let out = (*task)(&mut target);
                (target, out)
            })
        })
        .collect();

    runtime.block_on(async move {
        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => std::panic::resume_unwind(e.into_panic()),
            }
        }
        results
    })
}
