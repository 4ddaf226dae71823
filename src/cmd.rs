use std::fs::File;
use std::io::Write;
use std::process::{Command, Output, Stdio};

use log::debug;

use crate::error::{DeployError, DeployResult};

/// Run a prepared command and return its raw stdout bytes. Fails
/// if the command returns a non-zero exit code.
///
/// Nothing is trimmed, so callers that care about exact content
/// (file reads over SSH, NUL-separated git output) see every byte.
pub fn capture(command: &mut Command) -> DeployResult<Vec<u8>> {
    let output = spawn(command)?;
    check(command, output)
}

/// Run a prepared command, piping `stdin_data` to it.
pub fn run_with_stdin(command: &mut Command, stdin_data: &[u8]) -> DeployResult<()> {
    debug!("running: {}", describe(command));
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| not_found_or_io(command, e))?;

    if let Some(stdin) = &mut child.stdin {
        stdin.write_all(stdin_data)?;
    }
    drop(child.stdin.take());

    let output = child.wait_with_output()?;
    check(command, output).map(|_| ())
}

/// Run a prepared command with its stdin connected directly to an
/// open file, so large files are streamed rather than buffered.
pub fn run_with_stdin_file(command: &mut Command, file: File) -> DeployResult<()> {
    debug!("running: {}", describe(command));
    let output = command
        .stdin(Stdio::from(file))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(command, e))?;
    check(command, output).map(|_| ())
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn spawn(command: &mut Command) -> DeployResult<Output> {
    debug!("running: {}", describe(command));
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| not_found_or_io(command, e))
}

fn check(command: &Command, output: Output) -> DeployResult<Vec<u8>> {
    if output.status.success() {
        Ok(output.stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!("{} exited with {}: {stderr}", describe(command), output.status);
        Err(DeployError::CommandFailed {
            command: describe(command),
            stderr,
        })
    }
}

fn not_found_or_io(command: &Command, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(command.get_program().to_string_lossy().into_owned())
    } else {
        DeployError::Io(e)
    }
}

fn describe(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().into_owned()];
    parts.extend(command.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}
