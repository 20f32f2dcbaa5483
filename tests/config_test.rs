use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};
use vcs_version::config::{load_config, Config, CONFIG_FILE_NAME, FORCE_CMD_ENV};
use vcs_version::domain::Increment;
use vcs_version::VcsError;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
#[serial]
fn test_load_from_explicit_file() {
    let dir = TempDir::new().unwrap();
    let config = load_config(Some(&fixture("config_subprocess.toml")), dir.path()).unwrap();

    assert_eq!(config.versioning.increment, Increment::Minor);
    assert_eq!(config.versioning.dev_marker, ".dev0");
    assert!(config.backends.prefer_subprocess);
    assert!(config.backends.is_disabled("hg"));
    assert_eq!(config.backends.git_exe, "/usr/bin/git");
    assert_eq!(config.backends.hg_exe, "hg");
}

#[test]
#[serial]
fn test_load_from_repository_location() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[versioning]\ncached_version = \"3.1.4\"\n",
    )
    .unwrap();

    let config = load_config(None, dir.path()).unwrap();
    assert_eq!(config.versioning.cached_version.as_deref(), Some("3.1.4"));
    assert_eq!(config.versioning.increment, Increment::Patch);
}

#[test]
#[serial]
fn test_explicit_file_beats_location_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[versioning]\nincrement = \"major\"\n",
    )
    .unwrap();

    let config = load_config(Some(&fixture("config_subprocess.toml")), dir.path()).unwrap();
    assert_eq!(config.versioning.increment, Increment::Minor);
}

#[test]
#[serial]
fn test_malformed_file_is_a_config_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[versioning\nincrement = ").unwrap();
    temp_file.flush().unwrap();

    let dir = TempDir::new().unwrap();
    let err = load_config(Some(temp_file.path()), dir.path()).unwrap_err();
    assert!(matches!(err, VcsError::Config(_)));
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_config(Some(&dir.path().join("absent.toml")), dir.path()).unwrap_err();
    assert!(matches!(err, VcsError::Io(_)));
}

#[test]
#[serial]
fn test_env_override_applies_to_loaded_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[backends]\nprefer_subprocess = false\n").unwrap();
    temp_file.flush().unwrap();
    let dir = TempDir::new().unwrap();

    std::env::set_var(FORCE_CMD_ENV, "1");
    let config = load_config(Some(temp_file.path()), dir.path());
    std::env::remove_var(FORCE_CMD_ENV);

    assert!(config.unwrap().backends.prefer_subprocess);
}

#[test]
fn test_serialized_defaults_parse_back() {
    let text = toml::to_string(&Config::default()).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed, Config::default());
}
