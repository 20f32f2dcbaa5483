//! Entry points for packaging tools.
//!
//! Both operations are best-effort: a packaging tool should still be able to
//! build when the repository cannot be queried. Failures are logged as
//! [Degradation]s and replaced by an empty file list or a fallback version.
//! Only the absence of any usable backend is reported as an error.

use crate::backend::Backend;
use crate::config::{Config, VersioningConfig};
use crate::error::Result;
use crate::registry::{existing_only, Registry};
use crate::versioning::Versioning;
use crate::warning::Degradation;
use log::debug;
use std::path::Path;

/// Tracked files at `location`, including sub-repository files.
///
/// Backends rooted in a repository are tried in priority order and the
/// first one that lists files wins. Returns an empty list when none does.
pub fn file_finder(location: &Path, config: &Config) -> Vec<String> {
    let managers = Registry::new(&config.backends).get_valid_managers(location);
    find_files_with(location, existing_only(managers))
}

/// [file_finder] over an explicit list of backends
pub fn find_files_with(location: &Path, managers: Vec<Box<dyn Backend>>) -> Vec<String> {
    for manager in managers {
        match manager.find_all_files() {
            Ok(files) => {
                debug!("{} listed {} files", manager.name(), files.len());
                return files;
            }
            Err(e) => Degradation::FileDiscoveryFailed {
                backend: manager.name().to_string(),
                location: location.display().to_string(),
                reason: e.to_string(),
            }
            .report(),
        }
    }
    Degradation::NoFiles {
        location: location.display().to_string(),
    }
    .report();
    Vec::new()
}

/// The version to publish for `location`.
///
/// A cached version in the configuration is returned as is. Otherwise the
/// first valid backend computes the current version; when it cannot, the
/// configured increment itself (`0.0.1` for patch) is used.
pub fn calculate_version(location: &Path, config: &Config) -> Result<String> {
    if let Some(cached) = &config.versioning.cached_version {
        debug!("using cached version {}", cached);
        return Ok(cached.clone());
    }
    let manager = Registry::new(&config.backends).get_first_valid_manager(location)?;
    Ok(version_with(manager.as_ref(), &config.versioning))
}

/// Version computed by one backend, falling back to the increment
pub fn version_with(manager: &dyn Backend, options: &VersioningConfig) -> String {
    let fallback = options.increment.as_version().to_string();

    if manager.find_root().is_none() {
        Degradation::NoRepository {
            backend: manager.name().to_string(),
            location: manager.location().display().to_string(),
        }
        .report();
        return fallback;
    }

    match manager.get_current_version_marked(Some(options.increment), &options.dev_marker) {
        Ok(version) => version,
        Err(e) => {
            Degradation::VersionFallback {
                fallback: fallback.clone(),
                reason: e.to_string(),
            }
            .report();
            fallback
        }
    }
}
