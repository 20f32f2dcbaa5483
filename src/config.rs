use crate::domain::Increment;
use crate::error::{Result, VcsError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up at a repository location
pub const CONFIG_FILE_NAME: &str = "vcs-version.toml";

/// Setting this variable to a non-empty value forces command-line backends
/// ahead of in-process ones
pub const FORCE_CMD_ENV: &str = "VCS_VERSION_FORCE_CMD";

/// Represents the complete configuration for vcs-version.
///
/// Contains version inference settings and backend selection options.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub versioning: VersioningConfig,

    #[serde(default)]
    pub backends: BackendsConfig,
}

fn default_dev_marker() -> String {
    "dev".to_string()
}

/// Settings for computing the current version.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VersioningConfig {
    /// Component bumped when the working copy is past the last release
    #[serde(default)]
    pub increment: Increment,

    /// Suffix appended to inferred, unreleased versions
    #[serde(default = "default_dev_marker")]
    pub dev_marker: String,

    /// A version computed earlier (e.g. recorded in a source distribution);
    /// when set, no repository is consulted
    #[serde(default)]
    pub cached_version: Option<String>,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        VersioningConfig {
            increment: Increment::default(),
            dev_marker: default_dev_marker(),
            cached_version: None,
        }
    }
}

fn default_git_exe() -> String {
    "git".to_string()
}

fn default_hg_exe() -> String {
    "hg".to_string()
}

/// Settings for choosing among backends.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackendsConfig {
    /// Try command-line backends before in-process ones of equal priority
    #[serde(default)]
    pub prefer_subprocess: bool,

    /// Backend names (`git2`, `git`, `hg`) never to select
    #[serde(default)]
    pub disabled: Vec<String>,

    #[serde(default = "default_git_exe")]
    pub git_exe: String,

    #[serde(default = "default_hg_exe")]
    pub hg_exe: String,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        BackendsConfig {
            prefer_subprocess: false,
            disabled: Vec::new(),
            git_exe: default_git_exe(),
            hg_exe: default_hg_exe(),
        }
    }
}

impl BackendsConfig {
    /// Apply `VCS_VERSION_FORCE_CMD` from the environment
    pub fn with_env_overrides(mut self) -> Self {
        if env::var_os(FORCE_CMD_ENV).is_some_and(|value| !value.is_empty()) {
            self.prefer_subprocess = true;
        }
        self
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|disabled| disabled == name)
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `vcs-version.toml` at the repository location
/// 3. `.vcs-version.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// Environment overrides are applied to whichever configuration was found.
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
/// * `location` - Repository location being versioned
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>, location: &Path) -> Result<Config> {
    let local = location.join(CONFIG_FILE_NAME);

    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if local.exists() {
        fs::read_to_string(local)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default().with_env_overrides());
        }
    } else {
        return Ok(Config::default().with_env_overrides());
    };

    let config: Config = toml::from_str(&config_str).map_err(|e| VcsError::config(e.to_string()))?;
    Ok(config.with_env_overrides())
}

impl Config {
    pub fn with_env_overrides(mut self) -> Self {
        self.backends = self.backends.with_env_overrides();
        self
    }
}
