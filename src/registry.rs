//! Backend selection
//!
//! Every backend the crate knows about is declared once in a static table.
//! For a location, each entry is instantiated, the invalid ones are dropped
//! and the rest are ordered by descending [Backend::priority]. Equal
//! priorities keep table order, which puts the in-process git backend ahead
//! of the `git` executable unless command-line backends are preferred.

use crate::backend::{Backend, GitCommand, GitLibrary, MercurialCommand};
use crate::config::BackendsConfig;
use crate::error::{Result, VcsError};
use log::debug;
use std::path::Path;

/// One entry of the backend table
pub struct BackendSpec {
    pub name: &'static str,
    pub marker: &'static str,
    /// Runs the tool inside this process rather than as a child
    pub in_process: bool,
    build: fn(&Path, &BackendsConfig) -> Box<dyn Backend>,
}

impl BackendSpec {
    /// Instantiate this backend bound to `location`
    pub fn build(&self, location: &Path, config: &BackendsConfig) -> Box<dyn Backend> {
        (self.build)(location, config)
    }
}

static KNOWN_BACKENDS: [BackendSpec; 3] = [
    BackendSpec {
        name: "git2",
        marker: ".git",
        in_process: true,
        build: |location, _| Box::new(GitLibrary::new(location)),
    },
    BackendSpec {
        name: "git",
        marker: ".git",
        in_process: false,
        build: |location, config| {
            Box::new(GitCommand::with_exe(location, config.git_exe.clone()))
        },
    },
    BackendSpec {
        name: "hg",
        marker: ".hg",
        in_process: false,
        build: |location, config| {
            Box::new(MercurialCommand::with_exe(location, config.hg_exe.clone()))
        },
    },
];

/// All backends in declaration order
pub fn known_backends() -> &'static [BackendSpec] {
    &KNOWN_BACKENDS
}

/// Backend table filtered and ordered by configuration
pub struct Registry {
    specs: Vec<&'static BackendSpec>,
    config: BackendsConfig,
}

impl Registry {
    pub fn new(config: &BackendsConfig) -> Self {
        let mut specs: Vec<&'static BackendSpec> = known_backends()
            .iter()
            .filter(|spec| !config.is_disabled(spec.name))
            .collect();
        if config.prefer_subprocess {
            specs.sort_by_key(|spec| spec.in_process);
        }
        Registry {
            specs,
            config: config.clone(),
        }
    }

    /// Names of the backends that will be considered, in tie-break order
    pub fn names(&self) -> Vec<&'static str> {
        self.specs.iter().map(|spec| spec.name).collect()
    }

    /// Every enabled backend bound to `location`, valid or not
    pub fn candidates(&self, location: &Path) -> Vec<Box<dyn Backend>> {
        self.specs
            .iter()
            .map(|spec| spec.build(location, &self.config))
            .collect()
    }

    /// Valid backends for `location`, highest priority first
    pub fn get_valid_managers(&self, location: &Path) -> Vec<Box<dyn Backend>> {
        select_valid(self.candidates(location))
    }

    /// The preferred valid backend for `location`
    pub fn get_first_valid_manager(&self, location: &Path) -> Result<Box<dyn Backend>> {
        self.get_valid_managers(location)
            .into_iter()
            .next()
            .ok_or_else(|| VcsError::no_valid_backend(location))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(&BackendsConfig::default().with_env_overrides())
    }
}

/// Keep the valid backends, ordered by descending priority.
///
/// The sort is stable, so backends of equal priority keep their input order.
pub fn select_valid(candidates: Vec<Box<dyn Backend>>) -> Vec<Box<dyn Backend>> {
    let mut valid: Vec<(i32, Box<dyn Backend>)> = candidates
        .into_iter()
        .filter(|backend| {
            let valid = backend.is_valid();
            debug!(
                "{} at {} is {}",
                backend.name(),
                backend.location().display(),
                if valid { "valid" } else { "not valid" }
            );
            valid
        })
        .map(|backend| (backend.priority(), backend))
        .collect();
    valid.sort_by(|(a, _), (b, _)| b.cmp(a));
    valid.into_iter().map(|(_, backend)| backend).collect()
}

/// Keep only backends actually rooted in a repository
pub fn existing_only(managers: Vec<Box<dyn Backend>>) -> Vec<Box<dyn Backend>> {
    managers
        .into_iter()
        .filter(|backend| backend.find_root().is_some())
        .collect()
}

/// Valid backends for `location` using the default configuration
pub fn get_valid_managers(location: impl AsRef<Path>) -> Vec<Box<dyn Backend>> {
    Registry::default().get_valid_managers(location.as_ref())
}

/// The preferred valid backend for `location` using the default
/// configuration
pub fn get_first_valid_manager(location: impl AsRef<Path>) -> Result<Box<dyn Backend>> {
    Registry::default().get_first_valid_manager(location.as_ref())
}

/// Alias of [get_first_valid_manager] for the current directory
pub fn detect() -> Result<Box<dyn Backend>> {
    get_first_valid_manager(".")
}

/// Backend kinds whose marker directory exists directly at `location`
pub fn detect_markers(location: &Path) -> Vec<&'static str> {
    let mut markers: Vec<&'static str> = known_backends()
        .iter()
        .filter(|spec| location.join(spec.marker).is_dir())
        .map(|spec| spec.marker)
        .collect();
    markers.dedup();
    markers
}
