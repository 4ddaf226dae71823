use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use shell_words::quote;

use crate::config::Credentials;
use crate::error::{DeployError, DeployResult};
use crate::ssh::SshSession;
use crate::transport::{Transport, strip_trailing_newline};

/// A target directory on a remote host, reached over SSH.
///
/// Every operation changes into the target root (or the file's
/// directory) before touching anything, so no remote state is
/// cached between calls.
#[derive(Debug)]
pub struct RemoteTransport {
    root: String,
    credentials: Option<Credentials>,
    session: Option<SshSession>,
}

impl RemoteTransport {
    #[must_use]
    pub fn new(root: &str, credentials: Option<Credentials>) -> Self {
        Self {
            root: root.to_string(),
            credentials,
            session: None,
        }
    }

    fn session(&self) -> DeployResult<&SshSession> {
        self.session.as_ref().ok_or_else(|| DeployError::Connect {
            target: self.root.clone(),
            message: "not connected".into(),
        })
    }

    fn join(&self, name: &str) -> String {
        if name.is_empty() || name == "." {
            self.root.clone()
        } else {
            format!("{}/{name}", self.root.trim_end_matches('/'))
        }
    }

    /// Script that lists the target root.
    fn list_script(&self) -> String {
        format!("cd {} && ls -1A", quote(&self.root))
    }

    /// Script that writes stdin to `name`, creating its directory
    /// only when changing into it fails.
    fn store_script(&self, name: &str) -> String {
        let (dir, base) = match name.rsplit_once('/') {
            Some((dir, base)) => (self.join(dir), base),
            None => (self.root.clone(), name),
        };
        let dir = quote(&dir);
        format!(
            "{{ cd {dir} 2>/dev/null || {{ mkdir -p {dir} && cd {dir}; }}; }} && cat > {}",
            quote(base)
        )
    }

    fn rename_script(&self, from: &str, to: &str) -> String {
        let parent = to.rsplit_once('/').map_or(".", |(dir, _)| dir);
        format!(
            "cd {} && mkdir -p {} && mv -- {} {}",
            quote(&self.root),
            quote(parent),
            quote(from),
            quote(to)
        )
    }

    fn delete_script(&self, name: &str) -> String {
        format!("cd {} && rm -- {}", quote(&self.root), quote(name))
    }

    fn read_script(&self, name: &str) -> String {
        format!("cd {} && cat -- {}", quote(&self.root), quote(name))
    }
}

impl Transport for RemoteTransport {
    fn connect(&mut self) -> DeployResult<()> {
        if self.session.as_ref().is_some_and(SshSession::is_connected) {
            return Ok(());
        }

        let connect_error = |message: String| DeployError::Connect {
            target: self.root.clone(),
            message,
        };

        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| connect_error("no credentials configured".into()))?;
        let host = credentials
            .host
            .as_deref()
            .ok_or_else(|| connect_error("no host configured".into()))?;

        let mut session = SshSession::new(host);
        if let Some(user) = &credentials.user {
            session = session.with_user(user);
        }
        if let Some(port) = credentials.port {
            session = session.with_port(port);
        }
        if let Some(key) = &credentials.key {
            session = session.with_key(key);
        }
        if let Some(password) = &credentials.password {
            session = session.with_password(password);
        }

        session.connect().map_err(|e| connect_error(e.to_string()))?;
        debug!("connected to {host} for {}", self.root);
        self.session = Some(session);
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        let listing = match self.session().and_then(|s| s.exec(&self.list_script())) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("listing {}: {e}", self.root);
                return false;
            }
        };
        String::from_utf8_lossy(&listing)
            .lines()
            .any(|line| line == name)
    }

    fn read_file(&self, name: &str) -> DeployResult<String> {
        let bytes = self
            .session()?
            .exec(&self.read_script(name))
            .map_err(|e| DeployError::read(self.join(name), e))?;
        let contents =
            String::from_utf8(bytes).map_err(|e| DeployError::read(self.join(name), e))?;
        Ok(strip_trailing_newline(contents))
    }

    fn write_file(&self, name: &str, contents: &[u8]) -> DeployResult<()> {
        self.session()?
            .exec_with_stdin(&self.store_script(name), contents)
            .map_err(|e| DeployError::write(self.join(name), e))
    }

    fn copy_from(&self, name: &str, source: &Path) -> DeployResult<()> {
        let file = File::open(source).map_err(|e| {
            DeployError::read(source.display().to_string(), e)
        })?;
        self.session()?
            .exec_with_file(&self.store_script(name), file)
            .map_err(|e| DeployError::write(self.join(name), e))
    }

    fn rename(&self, from: &str, to: &str) -> DeployResult<()> {
        self.session()?
            .exec(&self.rename_script(from, to))
            .map(|_| ())
            .map_err(|e| DeployError::write(self.join(to), e))
    }

    fn delete(&self, name: &str) -> DeployResult<()> {
        self.session()?
            .exec(&self.delete_script(name))
            .map(|_| ())
            .map_err(|e| DeployError::delete(self.join(name), e))
    }

    fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.disconnect();
        }
    }
}
