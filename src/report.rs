use std::fmt::Write;

use crate::error::DeployError;
use crate::revision::Revision;
use crate::target::{DeployMode, DeployPlan};

/// How one target fared in the deploy phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub path: String,
    /// `None` if the deploy failed before its plan was computed.
    pub mode: Option<DeployMode>,
    pub files: usize,
    pub error: Option<String>,
}

impl TargetOutcome {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-target results of a run that got past locking and
/// validation, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub revision: Revision,
    pub outcomes: Vec<TargetOutcome>,
}

impl DeployReport {
    /// True only if every target deployed.
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(TargetOutcome::succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            match (&outcome.error, outcome.mode) {
                (None, mode) => {
                    let _ = writeln!(
                        out,
                        "Deployed successfully to {} ({} files, {})",
                        outcome.path,
                        outcome.files,
                        mode_label(mode)
                    );
                }
                (Some(error), _) => {
                    let _ = writeln!(out, "Deploy failed for {}: {error}", outcome.path);
                }
            }
        }

        let failed: Vec<String> = self.failed().map(|o| o.path.clone()).collect();
        if !failed.is_empty() {
            out.push_str("Deploy failed for the following target directories:\n");
            out.push_str(&list_targets(&failed));
            out.push_str("These targets are still locked and need manual attention.\n");
        }
        out.push_str("Done.\n");
        out
    }
}

/// What a dry run found on one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPreview {
    pub path: String,
    pub locked: bool,
    pub recorded_commit: Option<String>,
    pub plan: Result<DeployPlan, String>,
}

/// Result of a dry run: nothing was written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunReport {
    pub revision: Revision,
    pub targets: Vec<TargetPreview>,
}

impl DryRunReport {
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "=== Dry run for {}: no changes will be made ===\n",
            self.revision
        );
        for preview in &self.targets {
            let _ = writeln!(out, "--- {} ---", preview.path);
            if preview.locked {
                out.push_str("  locked: a deploy would abort\n");
            }
            match &preview.recorded_commit {
                Some(id) => {
                    let _ = writeln!(out, "  recorded commit: {id}");
                }
                None => out.push_str("  recorded commit: none\n"),
            }
            match &preview.plan {
                Ok(DeployPlan::Incremental { from, entries }) => {
                    let _ = writeln!(out, "  incremental from {from}: {} changes", entries.len());
                    for entry in entries {
                        let _ = writeln!(out, "    {entry}");
                    }
                }
                Ok(DeployPlan::Full { files }) => {
                    let _ = writeln!(out, "  full tree: {} files", files.len());
                }
                Err(e) => {
                    let _ = writeln!(out, "  error: {e}");
                }
            }
        }
        out
    }
}

/// Standard listing of target paths, one tab-indented per line.
#[must_use]
pub fn list_targets(paths: &[String]) -> String {
    paths.iter().fold(String::new(), |mut out, path| {
        let _ = writeln!(out, "\t{path}");
        out
    })
}

/// Operator-facing message for a run that stopped before
/// deploying.
#[must_use]
pub fn render_abort(error: &DeployError) -> String {
    let mut out = String::new();
    match error {
        DeployError::LockFailed {
            already_locked,
            cannot_lock,
        } => {
            if !already_locked.is_empty() {
                out.push_str("The following target directories are already locked:\n");
                out.push_str(&list_targets(already_locked));
            }
            if !cannot_lock.is_empty() {
                out.push_str("Unable to lock the following target directories:\n");
                out.push_str(&list_targets(cannot_lock));
            }
        }
        DeployError::Validation(paths) => {
            out.push_str("Invalid / missing commit information for the following directories:\n");
            out.push_str(&list_targets(paths));
            out.push_str("Use -h for a hard deploy to ignore recorded commits.\n");
        }
        other => {
            let _ = writeln!(out, "{other}");
        }
    }
    out.push_str("Aborting.\n");
    out
}

const fn mode_label(mode: Option<DeployMode>) -> &'static str {
    match mode {
        Some(DeployMode::Incremental) => "incremental",
        Some(DeployMode::Full) => "full tree",
        None => "not started",
    }
}
