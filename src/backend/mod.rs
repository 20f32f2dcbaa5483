//! Backend abstraction layer
//!
//! Every supported version-control tool is reached through the [Backend]
//! trait. A backend is bound to one location, constructed fresh for each
//! query and discarded afterwards. The concrete implementations are:
//!
//! - [git::GitCommand]: the `git` executable, one subprocess per query
//! - [mercurial::MercurialCommand]: the `hg` executable, one subprocess per query
//! - [library::GitLibrary]: libgit2 in-process, serialized through [crate::capture]
//! - [mock::MockBackend]: an in-memory repository for tests
//!
//! Version inference on top of these queries lives in [crate::versioning],
//! and choosing which backend to use for a location lives in
//! [crate::registry].
//!
//! ```rust,no_run
//! # use vcs_version::backend::{Backend, git::GitCommand};
//! # fn example() -> vcs_version::Result<()> {
//! let repo = GitCommand::new(".");
//! if repo.is_valid() {
//!     for tag in repo.get_tags(None)? {
//!         println!("{}", tag);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod git;
pub mod library;
pub mod mercurial;
pub mod mock;

pub use git::GitCommand;
pub use library::GitLibrary;
pub use mercurial::MercurialCommand;
pub use mock::MockBackend;

use crate::domain::{Description, TaggedRevision};
use crate::error::Result;
use chrono::{DateTime, FixedOffset};
use log::debug;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Priority every backend starts from
pub const BASE_PRIORITY: i32 = 1;

/// Repository queries a version-control backend must answer
///
/// ## Validity
///
/// [Backend::is_valid] probes the tool and the location. It never fails:
/// a missing tool, an unsupported tool version or a location that is not a
/// repository of this kind all report `false`. The remaining queries assume a
/// valid repository and propagate tool failures as errors.
///
/// ## Revisions
///
/// Revision identifiers are opaque strings in the backend's own syntax.
/// `None` always means the revision the working copy is based on.
///
/// Backends are `Send` but not `Sync`; libgit2 handles cannot be shared
/// between threads.
pub trait Backend: Send {
    /// Short identifier used in configuration and output (`git`, `hg`, ...)
    fn name(&self) -> &'static str;

    /// The location this backend is bound to
    fn location(&self) -> &Path;

    /// Directory that marks a repository of this kind (`.git`, `.hg`)
    fn marker(&self) -> &'static str;

    /// Whether this backend can operate at its location
    fn is_valid(&self) -> bool;

    /// Selection priority; higher wins
    ///
    /// Backends whose marker directory exists at the location score one
    /// above the base, so a checkout containing both `.git` and `.hg`
    /// still prefers the matching tool.
    fn priority(&self) -> i32 {
        if self.location().join(self.marker()).exists() {
            BASE_PRIORITY + 1
        } else {
            BASE_PRIORITY
        }
    }

    /// Top level of the repository, or `None` when the location is not
    /// inside one
    fn find_root(&self) -> Option<PathBuf>;

    /// Tracked files below the location, relative to it
    fn find_files(&self) -> Result<Vec<String>>;

    /// Tags attached directly to `rev`
    ///
    /// With no explicit revision, a working copy with local modifications
    /// has no tags.
    fn get_tags(&self, rev: Option<&str>) -> Result<BTreeSet<String>>;

    /// Every tag in the repository with the revision it points at, in the
    /// backend's stable listing order
    fn get_repo_tags(&self) -> Result<Vec<TaggedRevision>>;

    /// Parent revisions of `rev`
    fn get_parent_revs(&self, rev: Option<&str>) -> Result<Vec<String>>;

    /// Tags of the unique parent of `rev`
    ///
    /// A root revision, a merge, or a failure to list parents all mean no
    /// parent tags.
    fn get_parent_tags(&self, rev: Option<&str>) -> Result<BTreeSet<String>> {
        let parents = match self.get_parent_revs(rev) {
            Ok(parents) => parents,
            Err(e) => {
                debug!("{}: cannot resolve parents of {:?}: {}", self.name(), rev, e);
                return Ok(BTreeSet::new());
            }
        };

        match parents.as_slice() {
            [parent] => self.get_tags(Some(parent)),
            _ => Ok(BTreeSet::new()),
        }
    }

    /// Tags reachable by ancestry from `rev`, most recent first
    fn get_ancestral_tags(&self, rev: Option<&str>) -> Result<Vec<TaggedRevision>>;

    /// Whether the working copy has uncommitted changes to tracked files
    fn is_modified(&self) -> Result<bool>;

    /// Relative paths of sub-repositories declared at the location
    fn sub_paths(&self) -> Result<Vec<String>>;

    /// A backend of the same kind bound to another location
    fn subrepo(&self, location: PathBuf) -> Box<dyn Backend>;

    /// Backends for every declared sub-repository
    fn subrepos(&self) -> Result<Vec<Box<dyn Backend>>> {
        Ok(self
            .sub_paths()?
            .into_iter()
            .map(|path| self.subrepo(self.location().join(path)))
            .collect())
    }

    /// Tracked files including those of sub-repositories, each prefixed by
    /// the sub-repository's path relative to the location
    fn find_all_files(&self) -> Result<Vec<String>> {
        let mut files = self.find_files()?;
        for path in self.sub_paths()? {
            let subrepo = self.subrepo(self.location().join(&path));
            for file in subrepo.find_all_files()? {
                files.push(Path::new(&path).join(file).to_string_lossy().into_owned());
            }
        }
        Ok(files)
    }

    /// Commit time of `rev`
    fn get_timestamp(&self, rev: Option<&str>) -> Result<DateTime<FixedOffset>>;

    /// Position of the working copy relative to the latest numbered tag
    fn describe_version(&self) -> Result<Description>;

    /// Version of the underlying tool, when it can be determined
    fn tool_version(&self) -> Option<semver::Version>;
}

impl std::fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.location().display())
    }
}

/// Read a tool's dotted version number into a semver version.
///
/// Tools report versions like `2.39.2`, `2.39.2.windows.1` or `6.5` with
/// vendor suffixes; only the leading numeric components are kept and missing
/// ones are zero.
pub fn lenient_semver(text: &str) -> Option<semver::Version> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let captures = PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?").ok())
        .as_ref()?
        .captures(text.trim())?;

    let component = |i: usize| -> Option<u64> {
        match captures.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(semver::Version::new(component(1)?, component(2)?, component(3)?))
}

/// Whether `version` satisfies `requirement`; unparsable requirements fail closed
pub fn supports(version: &semver::Version, requirement: &str) -> bool {
    semver::VersionReq::parse(requirement)
        .map(|req| req.matches(version))
        .unwrap_or(false)
}

/// Split command output into non-blank lines
pub(crate) fn output_lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(str::trim_end).filter(|line| !line.trim().is_empty())
}
