use crate::domain::version::Version;
use std::fmt;

/// A tag together with the revision it points at.
///
/// The revision is opaque and backend specific: a Mercurial `local:hash`
/// pair, a short Git hash, or a full object id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaggedRevision {
    pub tag: String,
    pub revision: String,
}

impl TaggedRevision {
    pub fn new(tag: impl Into<String>, revision: impl Into<String>) -> Self {
        TaggedRevision {
            tag: tag.into(),
            revision: revision.into(),
        }
    }

    /// Parse one line of a tag listing where the revision is the last
    /// whitespace-separated field and the tag is everything before it
    /// (`hg tags` pads the two with spaces).
    ///
    /// Blank lines and lines with a single field yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        let split = line.rfind(char::is_whitespace)?;
        let (tag, revision) = line.split_at(split);
        let tag = tag.trim_end();
        let revision = revision.trim_start();
        if tag.is_empty() || revision.is_empty() {
            return None;
        }
        Some(TaggedRevision::new(tag, revision))
    }

    /// The strict version this tag names, if any
    pub fn version(&self) -> Option<Version> {
        Version::parse(&self.tag).ok()
    }
}

impl fmt::Display for TaggedRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag, self.revision)
    }
}

/// Parse every non-blank line of a tag listing, preserving order
pub fn parse_tag_listing(output: &str) -> Vec<TaggedRevision> {
    output.lines().filter_map(TaggedRevision::parse_line).collect()
}

/// Pick the winning version among a revision's tags.
///
/// Tags that are not strict versions are ignored. When several strict
/// versions share the revision the highest one wins, so `1.10` beats `1.9`
/// regardless of the order a backend listed them in.
pub fn best_version<'a, I>(tags: I) -> Option<(Version, &'a str)>
where
    I: IntoIterator<Item = &'a String>,
{
    tags.into_iter()
        .filter_map(|tag| Version::parse(tag).ok().map(|version| (version, tag.as_str())))
        .max_by(|(a, a_tag), (b, b_tag)| a.cmp(b).then_with(|| a_tag.cmp(b_tag)))
}
