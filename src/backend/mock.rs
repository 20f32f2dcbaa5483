use crate::backend::Backend;
use crate::domain::{Description, TaggedRevision};
use crate::error::{Result, VcsError};
use chrono::{DateTime, FixedOffset};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// In-memory backend for testing without a real repository
///
/// Revisions are plain strings. Tags are listed most recently added first,
/// the same order real backends report them in.
#[derive(Debug, Clone)]
pub struct MockBackend {
    location: PathBuf,
    valid: bool,
    priority: Option<i32>,
    files: Vec<String>,
    tags: Vec<TaggedRevision>,
    parents: HashMap<String, Vec<String>>,
    timestamps: HashMap<String, DateTime<FixedOffset>>,
    head: Option<String>,
    modified: bool,
    subrepos: BTreeMap<String, MockBackend>,
    failure: Option<String>,
}

impl MockBackend {
    /// Create a new empty, valid mock repository
    pub fn new(location: impl Into<PathBuf>) -> Self {
        MockBackend {
            location: location.into(),
            valid: true,
            priority: None,
            files: Vec::new(),
            tags: Vec::new(),
            parents: HashMap::new(),
            timestamps: HashMap::new(),
            head: None,
            modified: false,
            subrepos: BTreeMap::new(),
            failure: None,
        }
    }

    /// Report the backend as unusable at its location
    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    /// Override the marker-based priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Make every query fail as a broken tool would
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Add a tracked file
    pub fn add_file(&mut self, path: impl Into<String>) {
        self.files.push(path.into());
    }

    /// Add a commit on top of `parents` and move the working copy to it
    pub fn add_commit(&mut self, rev: impl Into<String>, parents: &[&str]) {
        let rev = rev.into();
        self.parents
            .insert(rev.clone(), parents.iter().map(|p| p.to_string()).collect());
        self.head = Some(rev);
    }

    /// Record the commit time of a revision
    pub fn set_timestamp(&mut self, rev: impl Into<String>, timestamp: DateTime<FixedOffset>) {
        self.timestamps.insert(rev.into(), timestamp);
    }

    /// Tag a revision; the newest tag is listed first
    pub fn add_tag(&mut self, tag: impl Into<String>, rev: impl Into<String>) {
        self.tags.insert(0, TaggedRevision::new(tag, rev));
    }

    /// Move the working copy to another revision
    pub fn set_head(&mut self, rev: impl Into<String>) {
        self.head = Some(rev.into());
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Declare a sub-repository at a path relative to this one
    pub fn add_subrepo(&mut self, path: impl Into<String>, subrepo: MockBackend) {
        self.subrepos.insert(path.into(), subrepo);
    }

    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(VcsError::command("mock", message.clone())),
            None if !self.valid => Err(VcsError::no_valid_backend(&self.location)),
            None => Ok(()),
        }
    }

    fn resolve(&self, rev: Option<&str>) -> Result<String> {
        match rev {
            Some(rev) if self.parents.contains_key(rev) => Ok(rev.to_string()),
            Some(rev) => self
                .tags
                .iter()
                .find(|tagged| tagged.tag == rev)
                .map(|tagged| tagged.revision.clone())
                .ok_or_else(|| VcsError::command("mock", format!("unknown revision '{}'", rev))),
            None => self
                .head
                .clone()
                .ok_or_else(|| VcsError::command("mock", "repository has no commits")),
        }
    }

    /// Distance of every ancestor of `rev`, including `rev` itself at 0
    fn ancestors(&self, rev: &str) -> HashMap<String, u32> {
        let mut seen = HashMap::new();
        let mut queue = VecDeque::from([(rev.to_string(), 0)]);
        while let Some((rev, distance)) = queue.pop_front() {
            if seen.contains_key(&rev) {
                continue;
            }
            for parent in self.parents.get(&rev).into_iter().flatten() {
                queue.push_back((parent.clone(), distance + 1));
            }
            seen.insert(rev, distance);
        }
        seen
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn marker(&self) -> &'static str {
        ".mock"
    }

    fn is_valid(&self) -> bool {
        self.valid && self.failure.is_none()
    }

    fn priority(&self) -> i32 {
        self.priority.unwrap_or_else(|| {
            if self.location.join(self.marker()).exists() {
                crate::backend::BASE_PRIORITY + 1
            } else {
                crate::backend::BASE_PRIORITY
            }
        })
    }

    fn find_root(&self) -> Option<PathBuf> {
        (self.valid && self.failure.is_none()).then(|| self.location.clone())
    }

    fn find_files(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.files.clone())
    }

    fn get_tags(&self, rev: Option<&str>) -> Result<BTreeSet<String>> {
        self.check()?;
        if rev.is_none() && self.modified {
            return Ok(BTreeSet::new());
        }
        let rev = self.resolve(rev)?;
        Ok(self
            .tags
            .iter()
            .filter(|tagged| tagged.revision == rev)
            .map(|tagged| tagged.tag.clone())
            .collect())
    }

    fn get_repo_tags(&self) -> Result<Vec<TaggedRevision>> {
        self.check()?;
        Ok(self.tags.clone())
    }

    fn get_parent_revs(&self, rev: Option<&str>) -> Result<Vec<String>> {
        self.check()?;
        let rev = self.resolve(rev)?;
        Ok(self.parents.get(&rev).cloned().unwrap_or_default())
    }

    fn get_ancestral_tags(&self, rev: Option<&str>) -> Result<Vec<TaggedRevision>> {
        self.check()?;
        let ancestors = self.ancestors(&self.resolve(rev)?);
        Ok(self
            .tags
            .iter()
            .filter(|tagged| ancestors.contains_key(&tagged.revision))
            .cloned()
            .collect())
    }

    fn is_modified(&self) -> Result<bool> {
        self.check()?;
        Ok(self.modified)
    }

    fn sub_paths(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.subrepos.keys().cloned().collect())
    }

    fn subrepo(&self, location: PathBuf) -> Box<dyn Backend> {
        let declared = location
            .strip_prefix(&self.location)
            .ok()
            .and_then(|relative| self.subrepos.get(relative.to_string_lossy().as_ref()));
        match declared {
            Some(subrepo) => {
                let mut subrepo = subrepo.clone();
                subrepo.location = location;
                Box::new(subrepo)
            }
            None => Box::new(MockBackend::new(location)),
        }
    }

    fn get_timestamp(&self, rev: Option<&str>) -> Result<DateTime<FixedOffset>> {
        self.check()?;
        let rev = self.resolve(rev)?;
        self.timestamps
            .get(&rev)
            .copied()
            .ok_or_else(|| VcsError::command("mock", format!("no timestamp for '{}'", rev)))
    }

    fn describe_version(&self) -> Result<Description> {
        self.check()?;
        let head = self.resolve(None)?;
        let ancestors = self.ancestors(&head);
        let (tag, distance) = self
            .tags
            .iter()
            .filter(|tagged| tagged.tag.chars().any(|c| c.is_ascii_digit()))
            .filter_map(|tagged| ancestors.get(&tagged.revision).map(|d| (tagged.tag.clone(), *d)))
            .min_by_key(|(_, distance)| *distance)
            .ok_or(VcsError::NoVersionTags)?;

        Ok(Description {
            tag,
            distance,
            node: format!("g{}", head),
            dirty: self.modified,
            date: self.get_timestamp(None)?,
        })
    }

    fn tool_version(&self) -> Option<semver::Version> {
        Some(semver::Version::new(1, 0, 0))
    }
}
