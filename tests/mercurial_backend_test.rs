mod common;

use common::tool_available;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use vcs_version::backend::{Backend, MercurialCommand};
use vcs_version::versioning::Versioning;

/// A temporary Mercurial repository driven through the `hg` executable, or
/// `None` when hg is not installed
struct HgRepo {
    dir: TempDir,
    clock: u64,
}

impl HgRepo {
    fn new() -> Option<Self> {
        if !tool_available("hg") {
            eprintln!("hg not found on PATH; skipping");
            return None;
        }
        let dir = TempDir::new().expect("Could not create temp dir");
        let repo = HgRepo {
            dir,
            clock: 1_700_000_000,
        };
        repo.hg(&["init"]);
        Some(repo)
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn hg(&self, args: &[&str]) -> String {
        let output = Command::new("hg")
            .args(args)
            .args(["--config", "ui.username=tester"])
            .env("HGPLAIN", "1")
            .current_dir(self.dir.path())
            .output()
            .expect("Could not run hg");
        assert!(
            output.status.success(),
            "hg {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    fn next_date(&mut self) -> String {
        self.clock += 60;
        format!("{} 0", self.clock)
    }

    fn commit_file(&mut self, name: &str, content: &str) {
        fs::write(self.dir.path().join(name), content).expect("Could not write file");
        let date = self.next_date();
        self.hg(&["commit", "-A", "-m", name, "-d", &date]);
    }

    /// `hg tag` commits the tag in a new changeset on top of the working copy
    fn tag(&mut self, name: &str) {
        let date = self.next_date();
        self.hg(&["tag", "-d", &date, name]);
    }

    fn backend(&self) -> MercurialCommand {
        MercurialCommand::new(self.path())
    }
}

#[test]
fn test_hg_is_valid_with_marker() {
    let Some(mut repo) = HgRepo::new() else { return };
    repo.commit_file("README", "readme\n");
    let backend = repo.backend();

    assert!(backend.is_valid());
    assert_eq!(backend.priority(), 2);
    assert!(backend.tool_version().is_some());

    let root = backend.find_root().expect("root");
    assert_eq!(
        fs::canonicalize(root).unwrap(),
        fs::canonicalize(repo.path()).unwrap()
    );
}

#[test]
fn test_hg_tagged_version_defers_from_tip() {
    let Some(mut repo) = HgRepo::new() else { return };
    repo.commit_file("README", "readme\n");
    repo.tag("1.0");
    let backend = repo.backend();

    // The working copy is on the tag changeset, which only carries `tip`
    assert!(backend.get_tags(None).unwrap().contains("tip"));
    assert_eq!(backend.get_current_version(None).unwrap(), "1.0");
}

#[test]
fn test_hg_dev_version_after_tag() {
    let Some(mut repo) = HgRepo::new() else { return };
    repo.commit_file("README", "readme\n");
    repo.tag("1.0");
    repo.commit_file("CHANGES", "more\n");
    let backend = repo.backend();

    assert_eq!(backend.get_current_version(None).unwrap(), "1.0.1dev");
}

#[test]
fn test_hg_two_tags_on_one_revision() {
    let Some(mut repo) = HgRepo::new() else { return };
    repo.commit_file("README", "readme\n");
    repo.hg(&["tag", "-r", "0", "-d", "1700001000 0", "1.9"]);
    repo.hg(&["tag", "-r", "0", "-d", "1700002000 0", "1.10"]);
    let backend = repo.backend();

    let tags = backend.get_tags(Some("0")).unwrap();
    assert!(tags.contains("1.9") && tags.contains("1.10"));
    assert_eq!(backend.get_latest_version().unwrap().to_string(), "1.10");
}

#[test]
fn test_hg_modified_working_copy_has_no_tags() {
    let Some(mut repo) = HgRepo::new() else { return };
    repo.commit_file("README", "readme\n");
    repo.tag("1.0");
    fs::write(repo.path().join("README"), "pending\n").unwrap();
    let backend = repo.backend();

    assert!(backend.is_modified().unwrap());
    assert!(backend.get_tags(None).unwrap().is_empty());
    assert_eq!(backend.get_current_version(None).unwrap(), "1.0.1dev");
}

#[test]
fn test_hg_repo_and_ancestral_tags() {
    let Some(mut repo) = HgRepo::new() else { return };
    repo.commit_file("README", "readme\n");
    repo.tag("1.0");
    repo.commit_file("CHANGES", "more\n");
    repo.tag("1.1");
    let backend = repo.backend();

    let repo_tags: Vec<String> = backend
        .get_repo_tags()
        .unwrap()
        .into_iter()
        .map(|t| t.tag)
        .collect();
    assert_eq!(repo_tags, vec!["tip", "1.1", "1.0"]);

    let ancestral: Vec<String> = backend
        .get_ancestral_tags(None)
        .unwrap()
        .into_iter()
        .map(|t| t.tag)
        .filter(|tag| tag != "tip")
        .collect();
    assert_eq!(ancestral, vec!["1.1", "1.0"]);
}

#[test]
fn test_hg_files_and_parents() {
    let Some(mut repo) = HgRepo::new() else { return };
    repo.commit_file("README", "readme\n");
    repo.commit_file("CHANGES", "more\n");
    let backend = repo.backend();

    let mut files = backend.find_all_files().unwrap();
    files.sort();
    assert_eq!(files, vec!["CHANGES", "README"]);

    assert_eq!(backend.get_parent_revs(None).unwrap(), vec!["1"]);
    assert!(backend.get_parent_tags(Some("0")).unwrap().is_empty());
    assert!(backend.sub_paths().unwrap().is_empty());
}

#[test]
fn test_hg_timestamp_and_describe() {
    let Some(mut repo) = HgRepo::new() else { return };
    repo.commit_file("README", "readme\n");
    repo.hg(&["tag", "-r", "0", "-d", "1700001000 0", "2.0"]);
    let backend = repo.backend();

    assert_eq!(backend.get_timestamp(Some("0")).unwrap().timestamp(), 1_700_000_060);

    let desc = backend.describe_version().unwrap();
    assert_eq!(desc.tag, "2.0");
    assert_eq!(desc.distance, 1);
    assert!(!desc.dirty);
}
