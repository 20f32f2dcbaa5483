use log::warn;
use std::fmt;

/// Non-fatal problems met while discovering files or computing a version.
/// Callers degrade (empty file list, fallback version) and report these
/// instead of failing the build.
#[derive(Debug, Clone, PartialEq)]
pub enum Degradation {
    /// A backend failed to list tracked files
    FileDiscoveryFailed {
        backend: String,
        location: String,
        reason: String,
    },
    /// No backend produced a file list
    NoFiles { location: String },
    /// The selected backend is usable but the location is not inside a
    /// repository
    NoRepository { backend: String, location: String },
    /// The version could not be computed from the repository
    VersionFallback { fallback: String, reason: String },
}

impl Degradation {
    /// Log this degradation at warning level
    pub fn report(&self) {
        warn!("{}", self);
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degradation::FileDiscoveryFailed {
                backend,
                location,
                reason,
            } => write!(
                f,
                "Error listing files with {} in {}: {}",
                backend, location, reason
            ),
            Degradation::NoFiles { location } => {
                write!(f, "No tracked files found in {}", location)
            }
            Degradation::NoRepository { backend, location } => write!(
                f,
                "{} found no repository at {}",
                backend, location
            ),
            Degradation::VersionFallback { fallback, reason } => {
                write!(f, "Falling back to version {}: {}", fallback, reason)
            }
        }
    }
}
