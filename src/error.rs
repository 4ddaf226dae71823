pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("config error: {0}")]
    Config(String),

    #[error("unable to connect to {target}: {message}")]
    Connect { target: String, message: String },

    #[error("no repository found at {0}")]
    RepositoryNotFound(String),

    #[error("invalid revision '{identifier}': {message}")]
    Resolution { identifier: String, message: String },

    #[error("unable to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("unable to write {path}: {message}")]
    Write { path: String, message: String },

    #[error("unable to delete {path}: {message}")]
    Delete { path: String, message: String },

    #[error(
        "unable to lock target directories: {}",
        join_paths(.already_locked, .cannot_lock)
    )]
    LockFailed {
        already_locked: Vec<String>,
        cannot_lock: Vec<String>,
    },

    #[error(
        "invalid or missing commit information for: {}",
        .0.join(", ")
    )]
    Validation(Vec<String>),

    #[error("command failed: {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn join_paths(first: &[String], second: &[String]) -> String {
    first
        .iter()
        .chain(second)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl DeployError {
    /// Build a [`DeployError::Read`] for a path on some target.
    pub fn read(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Read {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Build a [`DeployError::Write`] for a path on some target.
    pub fn write(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Write {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Build a [`DeployError::Delete`] for a path on some target.
    pub fn delete(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Delete {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
