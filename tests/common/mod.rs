#![allow(dead_code)]

use git2::{Oid, Repository, Signature, Time};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use vcs_version::backend::{Backend, GitCommand, GitLibrary};

/// A temporary git repository built with libgit2
pub struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
    clock: i64,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Could not create temp dir");
        let repo = Repository::init(dir.path()).expect("Could not init git repo");
        {
            let mut config = repo.config().expect("Could not get config");
            config
                .set_str("user.name", "Test User")
                .expect("Could not set user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("Could not set user.email");
        }
        TestRepo {
            dir,
            repo,
            clock: 1_700_000_000,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Signature one minute after the previous one, so creation order is
    /// unambiguous
    fn next_signature(&mut self) -> Signature<'static> {
        self.clock += 60;
        Signature::new("Test User", "test@example.com", &Time::new(self.clock, 0))
            .expect("Could not create signature")
    }

    /// Write a file, stage it and commit on HEAD
    pub fn commit_file(&mut self, name: &str, content: &str, message: &str) -> Oid {
        let head = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.target());
        self.commit_on(Some("HEAD"), head, name, content, message)
    }

    /// Commit on top of `parent` without moving HEAD
    pub fn commit_detached(
        &mut self,
        parent: Oid,
        name: &str,
        content: &str,
        message: &str,
    ) -> Oid {
        let oid = self.commit_on(None, Some(parent), name, content, message);
        // Restore the index and work tree to HEAD
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo
            .reset(head.as_object(), git2::ResetType::Hard, None)
            .unwrap();
        oid
    }

    fn commit_on(
        &mut self,
        update_ref: Option<&str>,
        parent: Option<Oid>,
        name: &str,
        content: &str,
        message: &str,
    ) -> Oid {
        let path = self.dir.path().join(name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).expect("Could not create directory");
        }
        fs::write(&path, content).expect("Could not write file");

        let signature = self.next_signature();
        let mut index = self.repo.index().expect("Could not get index");
        index
            .add_path(Path::new(name))
            .expect("Could not add file to index");
        index.write().expect("Could not write index");
        let tree_id = index.write_tree().expect("Could not write tree");
        let tree = self.repo.find_tree(tree_id).expect("Could not find tree");

        let parents: Vec<git2::Commit> = parent
            .map(|oid| self.repo.find_commit(oid).expect("Could not find parent"))
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        self.repo
            .commit(update_ref, &signature, &signature, message, &tree, &parent_refs)
            .expect("Could not create commit")
    }

    pub fn tag(&mut self, name: &str, target: Oid) {
        let object = self.repo.find_object(target, None).unwrap();
        self.repo
            .tag_lightweight(name, &object, false)
            .expect("Could not create tag");
    }

    pub fn tag_annotated(&mut self, name: &str, target: Oid) {
        let signature = self.next_signature();
        let object = self.repo.find_object(target, None).unwrap();
        self.repo
            .tag(name, &object, &signature, name, false)
            .expect("Could not create annotated tag");
    }

    /// Change a tracked file without committing
    pub fn modify(&self, name: &str, content: &str) {
        fs::write(self.dir.path().join(name), content).expect("Could not write file");
    }
}

pub fn tool_available(exe: &str) -> bool {
    Command::new(exe)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Git backends to exercise: the in-process one always, the executable when
/// it is installed
pub fn git_backends(location: &Path) -> Vec<Box<dyn Backend>> {
    let mut backends: Vec<Box<dyn Backend>> = vec![Box::new(GitLibrary::new(location))];
    if tool_available("git") {
        backends.push(Box::new(GitCommand::new(location)));
    } else {
        eprintln!("git not found on PATH; only testing the in-process backend");
    }
    backends
}
