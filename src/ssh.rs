use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, warn};

use crate::cmd;
use crate::error::{DeployError, DeployResult};

static NEXT_SOCKET: AtomicUsize = AtomicUsize::new(0);

/// SSH session wrapper for running small shell scripts and
/// streaming file contents to a remote host.
///
/// [`connect`](Self::connect) starts an OpenSSH control master so
/// every later call is multiplexed over one authenticated
/// connection. The master is shut down by
/// [`disconnect`](Self::disconnect) or when the session is dropped.
#[derive(Debug)]
pub struct SshSession {
    host: String,
    user: Option<String>,
    port: Option<u16>,
    key: Option<String>,
    password: Option<String>,
    control_path: Option<PathBuf>,
}

impl SshSession {
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            user: None,
            port: None,
            key: None,
            password: None,
            control_path: None,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_key(mut self, key_path: &str) -> Self {
        self.key = Some(key_path.to_string());
        self
    }

    /// Authenticate with a password instead of a key or agent.
    /// Requires `sshpass` on PATH.
    #[must_use]
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.control_path.is_some()
    }

    /// Open the control master. Calling this on a connected session
    /// is a no-op.
    pub fn connect(&mut self) -> DeployResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        if self.password.is_some() && !cmd::command_exists("sshpass") {
            return Err(DeployError::CommandNotFound("sshpass".into()));
        }

        let socket = std::env::temp_dir().join(format!(
            "git-deploy-{}-{}.sock",
            std::process::id(),
            NEXT_SOCKET.fetch_add(1, Ordering::Relaxed)
        ));

        cmd::capture(&mut self.master_command(&socket))?;

        debug!("ssh master for {} at {}", self.destination(), socket.display());
        self.control_path = Some(socket);
        Ok(())
    }

    /// Run a shell script on the remote host and capture its raw
    /// stdout.
    pub fn exec(&self, script: &str) -> DeployResult<Vec<u8>> {
        cmd::capture(&mut self.script_command(script))
    }

    /// Run a shell script on the remote host with `data` on stdin.
    pub fn exec_with_stdin(&self, script: &str, data: &[u8]) -> DeployResult<()> {
        cmd::run_with_stdin(&mut self.script_command(script), data)
    }

    /// Run a shell script on the remote host with a local file
    /// streamed to its stdin.
    pub fn exec_with_file(&self, script: &str, file: File) -> DeployResult<()> {
        cmd::run_with_stdin_file(&mut self.script_command(script), file)
    }

    /// Shut down the control master. Idempotent.
    pub fn disconnect(&mut self) {
        let Some(socket) = self.control_path.take() else {
            return;
        };

        let mut command = self.base_command();
        command
            .arg("-o")
            .arg(format!("ControlPath={}", socket.display()))
            .args(["-O", "exit"])
            .arg(self.destination());
        if let Err(e) = cmd::capture(&mut command) {
            warn!("closing ssh session to {}: {e}", self.destination());
        }
    }

    /// Authenticate once and leave a persistent master listening on
    /// `socket`. The remote side only runs `true`; ssh returns once
    /// the master has detached into the background.
    fn master_command(&self, socket: &Path) -> Command {
        let mut command = self.base_command();
        command
            .args(["-o", "ControlMaster=yes", "-o", "ControlPersist=yes"])
            .arg("-o")
            .arg(format!("ControlPath={}", socket.display()))
            .arg(self.destination())
            .arg("true");
        command
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }

    fn script_command(&self, script: &str) -> Command {
        let mut command = self.base_command();
        if let Some(socket) = &self.control_path {
            command
                .arg("-o")
                .arg(format!("ControlPath={}", socket.display()));
        }
        command.arg(self.destination()).arg(script);
        command
    }

    fn base_command(&self) -> Command {
        let mut command = match &self.password {
            Some(password) => {
                let mut c = Command::new("sshpass");
                c.env("SSHPASS", password).args(["-e", "ssh"]);
                c
            }
            None => Command::new("ssh"),
        };
        command.args(self.ssh_base_args());
        command
    }

    fn ssh_base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
        ];
        if self.password.is_none() {
            args.push("-o".to_string());
            args.push("BatchMode=yes".to_string());
        }
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn destination_with_and_without_user() {
        assert_eq!(SshSession::new("web1").destination(), "web1");
        assert_eq!(
            SshSession::new("web1").with_user("deploy").destination(),
            "deploy@web1"
        );
    }

    #[test]
    fn master_persists_on_its_control_socket() {
        let session = SshSession::new("web1").with_user("deploy");
        let command = session.master_command(Path::new("/tmp/git-deploy-1-0.sock"));

        let args = args(&command);
        assert!(args.windows(2).any(|w| w == ["-o", "ControlMaster=yes"]));
        assert!(args.windows(2).any(|w| w == ["-o", "ControlPersist=yes"]));
        assert!(
            args.windows(2)
                .any(|w| w == ["-o", "ControlPath=/tmp/git-deploy-1-0.sock"])
        );
        assert!(!args.iter().any(|a| a == "-M" || a == "-N" || a == "-f"));
        assert_eq!(args[args.len() - 2..], ["deploy@web1", "true"]);
    }

    #[test]
    fn key_and_port_are_passed_to_ssh() {
        let session = SshSession::new("web1").with_port(2222).with_key("/k/id");
        let command = session.script_command("true");

        assert_eq!(command.get_program(), "ssh");
        let args = args(&command);
        assert!(args.windows(2).any(|w| w == ["-p", "2222"]));
        assert!(args.windows(2).any(|w| w == ["-i", "/k/id"]));
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("true"));
    }

    #[test]
    fn password_goes_through_sshpass_env() {
        let session = SshSession::new("web1").with_password("s3cret");
        let command = session.script_command("true");

        assert_eq!(command.get_program(), "sshpass");
        let args = args(&command);
        assert_eq!(&args[..2], ["-e", "ssh"]);
        assert!(!args.iter().any(|a| a.contains("s3cret")));
        assert!(!args.contains(&"BatchMode=yes".to_string()));
    }

    #[test]
    fn disconnect_without_connect_is_noop() {
        let mut session = SshSession::new("web1");
        session.disconnect();
        session.disconnect();
        assert!(!session.is_connected());
    }
}
