use std::path::Path;

use serde::Deserialize;

use crate::error::{DeployError, DeployResult};

/// Default configuration file name, looked up in the working
/// directory.
pub const DEFAULT_CONFIG_FILE: &str = "git_deploy.config";

/// How a target directory is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Local,
    Remote,
}

impl TransportKind {
    /// Parse the `mode` field of a target. Case-insensitive;
    /// `ssh` is accepted as a synonym for `remote`.
    #[must_use]
    pub fn parse(mode: &str) -> Option<Self> {
        match mode.to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "remote" | "ssh" => Some(Self::Remote),
            _ => None,
        }
    }
}

/// Credentials handed to a remote transport. Opaque to
/// everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub key: Option<String>,
    pub password: Option<String>,
}

/// One deployment destination as described in the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    /// Target root. A remote root is used verbatim by the remote
    /// shell, so it is absolute or relative to the login directory;
    /// `~` is never expanded.
    pub path: String,
    pub transport: TransportKind,
    pub credentials: Option<Credentials>,
}

impl TargetDescriptor {
    #[must_use]
    pub fn local(path: &str) -> Self {
        Self {
            path: path.to_string(),
            transport: TransportKind::Local,
            credentials: None,
        }
    }

    #[must_use]
    pub fn remote(path: &str, credentials: Credentials) -> Self {
        Self {
            path: path.to_string(),
            transport: TransportKind::Remote,
            credentials: Some(credentials),
        }
    }
}

/// Source repository plus the ordered list of targets to keep in
/// sync with it.
///
/// ```
/// use git_deploy::config::{Config, TransportKind};
///
/// let config = Config::from_json(
///     r#"{"path": "/srv/src", "targets": [{"path": "/var/www"}]}"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.source_path, "/srv/src");
/// assert_eq!(config.targets[0].transport, TransportKind::Local);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_path: String,
    pub targets: Vec<TargetDescriptor>,
}

#[derive(Deserialize)]
struct RawConfig {
    path: Option<String>,
    targets: Option<Vec<RawTarget>>,
}

#[derive(Deserialize)]
struct RawTarget {
    path: Option<String>,
    mode: Option<String>,
    auth: Option<Credentials>,
}

impl Config {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> DeployResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Config(format!("unable to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate config JSON. Every problem found is
    /// reported in a single error.
    pub fn from_json(content: &str) -> DeployResult<Self> {
        let raw: RawConfig = serde_json::from_str(content)
            .map_err(|e| DeployError::Config(format!("parse error: {e}")))?;

        let mut errors = Vec::new();

        let source_path = match raw.path {
            Some(p) if !p.is_empty() => p,
            _ => {
                errors.push("path is missing".to_string());
                String::new()
            }
        };

        let mut targets = Vec::new();
        match raw.targets {
            None => errors.push("targets are missing".to_string()),
            Some(items) if items.is_empty() => errors.push("targets are empty".to_string()),
            Some(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    let transport = match item.mode.as_deref() {
                        None => TransportKind::Local,
                        Some(mode) => {
                            if let Some(kind) = TransportKind::parse(mode) {
                                kind
                            } else {
                                errors.push(format!(
                                    "target {index}: unsupported connection mode: {mode}"
                                ));
                                continue;
                            }
                        }
                    };
                    match item.path {
                        Some(path)
                            if transport == TransportKind::Remote && path.starts_with('~') =>
                        {
                            errors.push(format!(
                                "target {index}: remote path must not start with ~: {path}"
                            ));
                        }
                        Some(path) if !path.is_empty() => targets.push(TargetDescriptor {
                            path,
                            transport,
                            credentials: item.auth,
                        }),
                        _ => errors.push(format!("target {index}: path missing")),
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(Self {
                source_path,
                targets,
            })
        } else {
            Err(DeployError::Config(errors.join(", ")))
        }
    }
}
