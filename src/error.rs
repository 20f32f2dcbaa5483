use thiserror::Error;

/// Unified error type for repository and version operations
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("No source repository or suitable VCS version found at '{location}'")]
    NoValidBackend { location: String },

    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    #[error("In-process call `{command}` exited with code {code}: {message}")]
    InProcess {
        command: String,
        code: i32,
        message: String,
    },

    #[error("Re-entrant in-process call `{0}` is not supported")]
    Reentrant(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("No strict version tags found in repository history")]
    NoVersionTags,

    #[error("Unexpected output from {backend}: {detail}")]
    Output {
        backend: &'static str,
        detail: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in vcs-version
pub type Result<T> = std::result::Result<T, VcsError>;

impl VcsError {
    /// Create the "no usable backend" error for a location
    pub fn no_valid_backend(location: impl AsRef<std::path::Path>) -> Self {
        VcsError::NoValidBackend {
            location: location.as_ref().display().to_string(),
        }
    }

    /// Create a command failure from the rendered command line and its diagnostic
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        VcsError::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        VcsError::Version(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        VcsError::Config(msg.into())
    }

    /// Create an output parsing error for a backend
    pub fn output(backend: &'static str, detail: impl Into<String>) -> Self {
        VcsError::Output {
            backend,
            detail: detail.into(),
        }
    }
}
