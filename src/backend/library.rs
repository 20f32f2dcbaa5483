use crate::backend::{supports, Backend};
use crate::capture::in_process;
use crate::domain::{Description, TaggedRevision};
use crate::error::{Result, VcsError};
use chrono::{DateTime, FixedOffset};
use git2::{Commit, DescribeFormatOptions, DescribeOptions, Oid, Repository, StatusOptions};
use log::debug;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Oldest libgit2 whose describe and status behave like `git`'s
pub const MIN_LIBGIT2_VERSION: &str = ">=1.0.0";

/// Git through libgit2, in-process
///
/// Every query opens the repository inside an
/// [InProcessContext](crate::capture::InProcessContext), so calls from
/// several threads are serialized and a query issued from inside another
/// query fails instead of deadlocking.
#[derive(Debug, Clone)]
pub struct GitLibrary {
    location: PathBuf,
}

struct RepoTag {
    name: String,
    commit: Oid,
    created: i64,
}

impl GitLibrary {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        GitLibrary {
            location: location.into(),
        }
    }

    fn call<T>(&self, operation: &str, query: impl FnOnce(&Repository) -> Result<T>) -> Result<T> {
        let location = self.location.clone();
        in_process(format!("git2 {}", operation), move |_| {
            let repo = Repository::discover(&location)?;
            query(&repo)
        })
    }

    fn resolve<'r>(repo: &'r Repository, rev: Option<&str>) -> Result<Commit<'r>> {
        Ok(repo.revparse_single(rev.unwrap_or("HEAD"))?.peel_to_commit()?)
    }

    /// Tag references peeled to commits, most recently created first
    fn repo_tags(repo: &Repository) -> Result<Vec<RepoTag>> {
        let mut tags = Vec::new();
        for reference in repo.references_glob("refs/tags/*")? {
            let reference = reference?;
            let Some(name) = reference.shorthand().map(str::to_string) else {
                continue;
            };
            let commit = match reference.peel_to_commit() {
                Ok(commit) => commit,
                Err(e) => {
                    debug!("git2: skipping tag {} that is not a commit: {}", name, e);
                    continue;
                }
            };
            let created = match reference.peel_to_tag() {
                Ok(tag) => tag
                    .tagger()
                    .map(|tagger| tagger.when().seconds())
                    .unwrap_or_else(|| commit.time().seconds()),
                Err(_) => commit.time().seconds(),
            };
            tags.push(RepoTag {
                name,
                commit: commit.id(),
                created,
            });
        }
        tags.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.name.cmp(&b.name)));
        Ok(tags)
    }

    /// Changes to tracked files, including submodule checkouts that moved
    fn is_dirty(repo: &Repository) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);
        Ok(!repo.statuses(Some(&mut options))?.is_empty())
    }

    /// The bound location relative to the work tree root
    fn prefix(repo: &Repository, location: &Path) -> Result<PathBuf> {
        let workdir = repo
            .workdir()
            .ok_or_else(|| VcsError::output("git2", "repository has no work tree"))?;
        let workdir = fs::canonicalize(workdir)?;
        let location = fs::canonicalize(location)?;
        Ok(location
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .unwrap_or_default())
    }
}

fn commit_time(commit: &Commit<'_>) -> Result<DateTime<FixedOffset>> {
    let time = commit.time();
    let minutes = time.offset_minutes();
    let offset = FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| VcsError::output("git2", format!("bad time zone offset {}", minutes)))?;
    DateTime::from_timestamp(time.seconds(), 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or_else(|| VcsError::output("git2", format!("bad commit time {}", time.seconds())))
}

impl Backend for GitLibrary {
    fn name(&self) -> &'static str {
        "git2"
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn marker(&self) -> &'static str {
        ".git"
    }

    fn is_valid(&self) -> bool {
        let supported = self
            .tool_version()
            .map(|version| supports(&version, MIN_LIBGIT2_VERSION))
            .unwrap_or(false);
        if !supported {
            return false;
        }
        self.call("status", |repo| {
            if repo.is_bare() {
                return Err(VcsError::output("git2", "bare repository"));
            }
            Self::is_dirty(repo)
        })
        .is_ok()
    }

    /// The work tree as a resolved path without a trailing separator, the
    /// form `git rev-parse --show-toplevel` prints
    fn find_root(&self) -> Option<PathBuf> {
        self.call("rev-parse", |repo| {
            let workdir = repo
                .workdir()
                .ok_or_else(|| VcsError::output("git2", "repository has no work tree"))?;
            Ok(fs::canonicalize(workdir)?)
        })
        .ok()
    }

    fn find_files(&self) -> Result<Vec<String>> {
        let location = self.location.clone();
        self.call("ls-files", move |repo| {
            let prefix = Self::prefix(repo, &location)?;
            let index = repo.index()?;
            let mut files = Vec::new();
            for entry in index.iter() {
                let path = PathBuf::from(String::from_utf8_lossy(&entry.path).into_owned());
                if let Ok(relative) = path.strip_prefix(&prefix) {
                    files.push(relative.to_string_lossy().into_owned());
                }
            }
            Ok(files)
        })
    }

    fn get_tags(&self, rev: Option<&str>) -> Result<BTreeSet<String>> {
        self.call("tag --points-at", |repo| {
            if rev.is_none() && Self::is_dirty(repo)? {
                return Ok(BTreeSet::new());
            }
            let target = Self::resolve(repo, rev)?.id();
            Ok(Self::repo_tags(repo)?
                .into_iter()
                .filter(|tag| tag.commit == target)
                .map(|tag| tag.name)
                .collect())
        })
    }

    fn get_repo_tags(&self) -> Result<Vec<TaggedRevision>> {
        self.call("for-each-ref", |repo| {
            Ok(Self::repo_tags(repo)?
                .into_iter()
                .map(|tag| TaggedRevision::new(tag.name, tag.commit.to_string()))
                .collect())
        })
    }

    fn get_parent_revs(&self, rev: Option<&str>) -> Result<Vec<String>> {
        self.call("log --format=%P", |repo| {
            Ok(Self::resolve(repo, rev)?
                .parent_ids()
                .map(|oid| oid.to_string())
                .collect())
        })
    }

    fn get_ancestral_tags(&self, rev: Option<&str>) -> Result<Vec<TaggedRevision>> {
        self.call("tag --merged", |repo| {
            let head = Self::resolve(repo, rev)?.id();
            let mut tagged = Vec::new();
            for tag in Self::repo_tags(repo)? {
                if tag.commit == head || repo.graph_descendant_of(head, tag.commit)? {
                    tagged.push(TaggedRevision::new(tag.name, tag.commit.to_string()));
                }
            }
            Ok(tagged)
        })
    }

    fn is_modified(&self) -> Result<bool> {
        self.call("status", Self::is_dirty)
    }

    fn sub_paths(&self) -> Result<Vec<String>> {
        self.call("submodule status", |repo| {
            Ok(repo
                .submodules()?
                .iter()
                .map(|submodule| submodule.path().to_string_lossy().into_owned())
                .collect())
        })
    }

    fn subrepo(&self, location: PathBuf) -> Box<dyn Backend> {
        Box::new(GitLibrary::new(location))
    }

    fn get_timestamp(&self, rev: Option<&str>) -> Result<DateTime<FixedOffset>> {
        self.call("log --format=%cI", |repo| commit_time(&Self::resolve(repo, rev)?))
    }

    fn describe_version(&self) -> Result<Description> {
        self.call("describe", |repo| {
            let mut options = DescribeOptions::new();
            options.describe_tags().pattern("*[0-9]*");
            let mut format = DescribeFormatOptions::new();
            format.always_use_long_format(true).dirty_suffix("-dirty");

            let output = repo.describe(&options)?.format(Some(&format))?;
            Description::parse(&output, commit_time(&Self::resolve(repo, None)?)?)
        })
    }

    fn tool_version(&self) -> Option<semver::Version> {
        let (major, minor, patch) = git2::Version::get().libgit2_version();
        Some(semver::Version::new(major.into(), minor.into(), patch.into()))
    }
}
