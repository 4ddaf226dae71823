//! Drives the command line entry point against a real repository.
//!
//! Requires Git. Skipped in normal `cargo test` runs unless the
//! `integration` feature is enabled.

#![cfg(feature = "integration")]

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use clap::Parser;
use common::path_str;
use git_deploy::cli::Cli;
use git_deploy::error::DeployError;
use git_deploy::target::{COMMIT_MARKER, LOCK_MARKER};
use tempfile::{TempDir, tempdir};

fn git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
        .args(args)
        .status()
        .expect("git failed to start");
    assert!(status.success(), "git {args:?} failed");
}

/// A committed source tree with `a.txt` and a config file pointing
/// at `targets`.
fn setup(targets: &[&Path]) -> (TempDir, PathBuf) {
    let src = tempdir().unwrap();
    git(src.path(), &["init", "-q"]);
    fs::write(src.path().join("a.txt"), "A").unwrap();
    git(src.path(), &["add", "-A"]);
    git(src.path(), &["commit", "-q", "-m", "first"]);

    let config = serde_json::json!({
        "path": path_str(src.path()),
        "targets": targets
            .iter()
            .map(|t| serde_json::json!({"path": path_str(t)}))
            .collect::<Vec<_>>(),
    });
    let config_path = src.path().join(".git").join("git_deploy.config");
    fs::write(&config_path, config.to_string()).unwrap();
    (src, config_path)
}

fn cli(config: &Path, extra: &[&str]) -> Cli {
    let config = path_str(config);
    let mut args = vec!["git-deploy", "-c", config.as_str()];
    args.extend_from_slice(extra);
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn every_target_deployed_reports_success() {
    let target = tempdir().unwrap();
    let (_src, config) = setup(&[target.path()]);

    let deployed = cli(&config, &["-h"]).execute().unwrap();

    assert!(deployed);
    assert!(target.path().join(COMMIT_MARKER).exists());
    assert!(!target.path().join(LOCK_MARKER).exists());
}

#[test]
fn failed_target_reports_failure() {
    let target = tempdir().unwrap();
    let (src, config) = setup(&[target.path()]);
    // committed but gone from the working tree the files are copied from
    fs::remove_file(src.path().join("a.txt")).unwrap();

    let deployed = cli(&config, &["--hard"]).execute().unwrap();

    assert!(!deployed);
    assert!(target.path().join(LOCK_MARKER).exists());
    assert!(!target.path().join(COMMIT_MARKER).exists());
}

#[test]
fn lock_failure_is_an_error() {
    let target = tempdir().unwrap();
    fs::write(target.path().join(LOCK_MARKER), "locked\n").unwrap();
    let (_src, config) = setup(&[target.path()]);

    let err = cli(&config, &["-h"]).execute().unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::LockFailed { already_locked, .. }) if already_locked.len() == 1
    ));
}

#[test]
fn dry_run_touches_nothing() {
    let target = tempdir().unwrap();
    let (_src, config) = setup(&[target.path()]);

    assert!(cli(&config, &["-h", "--dry-run"]).execute().unwrap());
    assert_eq!(fs::read_dir(target.path()).unwrap().count(), 0);
}
