mod common;

use common::TestRepo;
use serial_test::serial;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn vcs_version(location: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vcs-version"))
        .arg("--location")
        .arg(location)
        .args(args)
        .env_remove("VCS_VERSION_FORCE_CMD")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute vcs-version")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_vcs-version"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("vcs-version"));
    assert!(text.contains("Compute package versions"));
}

#[test]
#[serial]
fn test_version_of_tagged_repository() {
    let mut repo = TestRepo::new();
    let first = repo.commit_file("README.md", "readme\n", "Initial commit");
    repo.tag("1.0", first);

    // No subcommand means `version`
    let output = vcs_version(repo.path(), &[]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "1.0");

    repo.commit_file("README.md", "more\n", "Second commit");
    let output = vcs_version(repo.path(), &["version", "--increment", "minor"]);
    assert_eq!(stdout(&output).trim(), "1.1dev");

    let output = vcs_version(repo.path(), &["next", "-i", "major"]);
    assert_eq!(stdout(&output).trim(), "2.0");
}

#[test]
#[serial]
fn test_version_falls_back_without_tags() {
    let mut repo = TestRepo::new();
    repo.commit_file("README.md", "readme\n", "Initial commit");

    let output = vcs_version(repo.path(), &["version"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "0.0.1");
}

#[test]
#[serial]
fn test_files_and_tags() {
    let mut repo = TestRepo::new();
    repo.commit_file("README.md", "readme\n", "readme");
    let second = repo.commit_file("src/lib.rs", "// lib\n", "lib");
    repo.tag("0.3", second);

    let output = vcs_version(repo.path(), &["files"]);
    assert!(output.status.success());
    let mut files: Vec<String> = stdout(&output).lines().map(String::from).collect();
    files.sort();
    assert_eq!(files, vec!["README.md", "src/lib.rs"]);

    let output = vcs_version(repo.path(), &["tags"]);
    assert!(stdout(&output).starts_with(&format!("0.3 {}", second)));
}

#[test]
#[serial]
fn test_backends_marks_selection() {
    let mut repo = TestRepo::new();
    repo.commit_file("README.md", "readme\n", "readme");

    let output = vcs_version(repo.path(), &["backends"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Backends (selection order):"));
    assert!(text.contains("→ git2"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Repository markers at"));
    assert!(stderr.contains(".git"));
}

#[test]
#[serial]
fn test_describe() {
    let mut repo = TestRepo::new();
    let first = repo.commit_file("README.md", "readme\n", "readme");
    repo.tag("v2.1", first);
    repo.commit_file("README.md", "more\n", "more");

    let output = vcs_version(repo.path(), &["describe"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("v2.1 (1 commit since, g"));
}

#[test]
#[serial]
fn test_no_repository_is_an_error() {
    let dir = TempDir::new().unwrap();
    let output = vcs_version(dir.path(), &["version"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR:"));
    assert!(stderr.contains("No source repository"));
}

#[test]
#[serial]
fn test_cached_version_needs_no_repository() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("vcs-version.toml"),
        "[versioning]\ncached_version = \"4.2\"\n",
    )
    .unwrap();

    let output = vcs_version(dir.path(), &["version"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "4.2");
}
