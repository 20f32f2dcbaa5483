use crate::backend::{lenient_semver, output_lines, supports, Backend};
use crate::domain::{Description, TaggedRevision};
use crate::error::{Result, VcsError};
use crate::exec::CommandRunner;
use chrono::{DateTime, FixedOffset};
use log::debug;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Oldest git whose `for-each-ref` understands `%(if)` and whose `tag`
/// understands `--merged`
pub const MIN_GIT_VERSION: &str = ">=2.13.0";

const REPO_TAGS_FORMAT: &str =
    "--format=%(refname:short) %(if)%(*objectname)%(then)%(*objectname)%(else)%(objectname)%(end)";

/// Git through the `git` executable
#[derive(Debug, Clone)]
pub struct GitCommand {
    location: PathBuf,
    runner: CommandRunner,
}

impl GitCommand {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self::with_exe(location, "git")
    }

    /// Use a specific git executable
    pub fn with_exe(location: impl Into<PathBuf>, exe: impl Into<String>) -> Self {
        GitCommand {
            location: location.into(),
            runner: CommandRunner::new(exe),
        }
    }

    /// Run git with `args` in the bound location
    pub fn invoke(&self, args: &[&str]) -> Result<String> {
        self.runner.run(&self.location, args)
    }

    /// Extract the version number from `git version` output
    pub fn parse_version(output: &str) -> Option<String> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        PATTERN
            .get_or_init(|| Regex::new(r"git version (\d+\.\d+[^ ]*)").ok())
            .as_ref()?
            .captures(output)
            .map(|c| c[1].trim().to_string())
    }

    fn lines(&self, args: &[&str]) -> Result<Vec<String>> {
        let output = self.invoke(args)?;
        Ok(output_lines(&output).map(str::to_string).collect())
    }
}

impl Backend for GitCommand {
    fn name(&self) -> &'static str {
        "git"
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn marker(&self) -> &'static str {
        ".git"
    }

    fn is_valid(&self) -> bool {
        let Some(version) = self.tool_version() else {
            debug!("git: no usable `{}` executable", self.runner.exe());
            return false;
        };
        if !supports(&version, MIN_GIT_VERSION) {
            debug!("git: version {} does not satisfy {}", version, MIN_GIT_VERSION);
            return false;
        }
        self.invoke(&["status", "--porcelain", "--untracked-files=no"])
            .is_ok()
    }

    fn find_root(&self) -> Option<PathBuf> {
        let root = self.invoke(&["rev-parse", "--show-toplevel"]).ok()?;
        let root = root.trim();
        (!root.is_empty()).then(|| PathBuf::from(root))
    }

    fn find_files(&self) -> Result<Vec<String>> {
        self.lines(&["ls-files"])
    }

    fn get_tags(&self, rev: Option<&str>) -> Result<BTreeSet<String>> {
        if rev.is_none() && self.is_modified()? {
            return Ok(BTreeSet::new());
        }
        let rev = rev.unwrap_or("HEAD");
        Ok(self
            .lines(&["tag", "--points-at", rev])?
            .into_iter()
            .collect())
    }

    fn get_repo_tags(&self) -> Result<Vec<TaggedRevision>> {
        let output = self.invoke(&[
            "for-each-ref",
            "--sort=-creatordate",
            REPO_TAGS_FORMAT,
            "refs/tags",
        ])?;
        output_lines(&output)
            .map(|line| {
                TaggedRevision::parse_line(line)
                    .ok_or_else(|| VcsError::output("git", format!("bad tag line '{}'", line)))
            })
            .collect()
    }

    fn get_parent_revs(&self, rev: Option<&str>) -> Result<Vec<String>> {
        let rev = rev.unwrap_or("HEAD");
        let output = self.invoke(&["log", "-n", "1", "--format=%P", rev])?;
        Ok(output.split_whitespace().map(str::to_string).collect())
    }

    fn get_ancestral_tags(&self, rev: Option<&str>) -> Result<Vec<TaggedRevision>> {
        let rev = rev.unwrap_or("HEAD");
        let merged: HashSet<String> = self.lines(&["tag", "--merged", rev])?.into_iter().collect();
        Ok(self
            .get_repo_tags()?
            .into_iter()
            .filter(|tagged| merged.contains(&tagged.tag))
            .collect())
    }

    fn is_modified(&self) -> Result<bool> {
        let output = self.invoke(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(!output.trim().is_empty())
    }

    fn sub_paths(&self) -> Result<Vec<String>> {
        let output = self.invoke(&["submodule", "status"])?;
        output_lines(&output)
            .map(|line| {
                line.split_whitespace()
                    .nth(1)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        VcsError::output("git", format!("bad submodule line '{}'", line))
                    })
            })
            .collect()
    }

    fn subrepo(&self, location: PathBuf) -> Box<dyn Backend> {
        Box::new(GitCommand {
            location,
            runner: self.runner.clone(),
        })
    }

    fn get_timestamp(&self, rev: Option<&str>) -> Result<DateTime<FixedOffset>> {
        let rev = rev.unwrap_or("HEAD");
        let output = self.invoke(&[
            "-c",
            "log.showSignature=false",
            "log",
            "-n",
            "1",
            "--format=%cI",
            rev,
        ])?;
        let output = output.trim();
        DateTime::parse_from_rfc3339(output)
            .map_err(|e| VcsError::output("git", format!("bad commit date '{}': {}", output, e)))
    }

    fn describe_version(&self) -> Result<Description> {
        let output = self.invoke(&[
            "describe",
            "--dirty",
            "--tags",
            "--long",
            "--match",
            "*[0-9]*",
        ])?;
        Description::parse(&output, self.get_timestamp(None)?)
    }

    fn tool_version(&self) -> Option<semver::Version> {
        let output = self.invoke(&["version"]).ok()?;
        let first = output.lines().next()?;
        lenient_semver(&Self::parse_version(first)?)
    }
}
