//! Version inference from repository tags
//!
//! The current version of a working copy is the tag it sits on, when it
//! sits on a strict-version tag and has no local modifications. Otherwise it
//! is the version inferred to follow the latest release, marked as a
//! development version (`1.0.1dev`).

use crate::backend::Backend;
use crate::domain::{best_version, infer_next_version, Increment, Version};
use crate::error::{Result, VcsError};
use log::debug;
use std::collections::BTreeSet;

/// Suffix marking an inferred, unreleased version
pub const DEFAULT_DEV_MARKER: &str = "dev";

/// Pseudo-tag Mercurial attaches to the newest changeset
const TIP: &str = "tip";

/// Version queries available on every backend
pub trait Versioning: Backend {
    /// Strict versions of every tag in the repository, in listing order;
    /// tags that are not strict versions are skipped
    fn get_strict_versions(&self) -> Result<Vec<Version>> {
        Ok(self
            .get_repo_tags()?
            .iter()
            .filter_map(|tagged| tagged.version())
            .collect())
    }

    /// Tags that describe the working copy.
    ///
    /// Tagging a Mercurial changeset commits the tag in a new changeset,
    /// leaving the working copy on `tip`. An unmodified working copy whose
    /// only label is `tip` (no strict version tag beside it) is therefore
    /// described by the tags of its parent.
    fn get_current_tags(&self) -> Result<BTreeSet<String>> {
        let tags = self.get_tags(None)?;
        if tags.contains(TIP) && best_version(&tags).is_none() && !self.is_modified()? {
            debug!("{}: using the tags of the parent of {}", self.name(), TIP);
            return self.get_parent_tags(Some(TIP));
        }
        Ok(tags)
    }

    /// The strict-version tag the working copy sits on, verbatim; the
    /// highest version wins when there are several
    fn get_tagged_version_name(&self) -> Result<Option<String>> {
        let tags = self.get_current_tags()?;
        Ok(best_version(&tags).map(|(_, tag)| tag.to_string()))
    }

    /// The version of the tag the working copy sits on, if any
    fn get_tagged_version(&self) -> Result<Option<Version>> {
        let tags = self.get_current_tags()?;
        Ok(best_version(&tags).map(|(version, _)| version))
    }

    /// Highest strict version tagged anywhere in the repository
    fn get_latest_version(&self) -> Result<Version> {
        self.get_strict_versions()?
            .into_iter()
            .max()
            .ok_or(VcsError::NoVersionTags)
    }

    /// The version expected to follow the latest release
    fn get_next_version(&self, increment: Option<Increment>) -> Result<Version> {
        let latest = self.get_latest_version()?;
        let next = infer_next_version(&latest, increment.unwrap_or_default());
        debug!("{}: latest release {}, next {}", self.name(), latest, next);
        Ok(next)
    }

    /// The tag the working copy sits on, or the next version followed by
    /// `dev`
    fn get_current_version(&self, increment: Option<Increment>) -> Result<String> {
        self.get_current_version_marked(increment, DEFAULT_DEV_MARKER)
    }

    /// Like [Versioning::get_current_version] with a custom development
    /// marker
    fn get_current_version_marked(
        &self,
        increment: Option<Increment>,
        dev_marker: &str,
    ) -> Result<String> {
        if let Some(tag) = self.get_tagged_version_name()? {
            return Ok(tag);
        }
        Ok(format!("{}{}", self.get_next_version(increment)?, dev_marker))
    }
}

impl<B: Backend + ?Sized> Versioning for B {}
