use crate::error::{Result, VcsError};
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Position of the working copy relative to the most recent reachable tag,
/// as reported by `git describe --long --dirty`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub tag: String,
    /// Commits between the tag and the described revision
    pub distance: u32,
    /// Abbreviated node id, prefixed with the tool's marker (`g` for git)
    pub node: String,
    pub dirty: bool,
    pub date: DateTime<FixedOffset>,
}

fn describe_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^(?P<tag>.*?)-(?P<distance>\d+)-(?P<node>g[0-9A-Fa-f]+)(?:-(?P<dirty>dirty))?$",
            )
            .ok()
        })
        .as_ref()
}

impl Description {
    /// Parse long-format describe output such as `v1.0.0-3-gdeadbee-dirty`
    pub fn parse(output: &str, date: DateTime<FixedOffset>) -> Result<Self> {
        let output = output.trim();
        let captures = describe_pattern()
            .and_then(|re| re.captures(output))
            .ok_or_else(|| VcsError::output("describe", format!("cannot parse '{}'", output)))?;

        let distance = captures["distance"].parse::<u32>().map_err(|e| {
            VcsError::output("describe", format!("bad distance in '{}': {}", output, e))
        })?;

        Ok(Description {
            tag: captures["tag"].to_string(),
            distance,
            node: captures["node"].to_string(),
            dirty: captures.name("dirty").is_some(),
            date,
        })
    }

    /// True when the working copy sits exactly on the tag, unmodified
    pub fn is_exact(&self) -> bool {
        self.distance == 0 && !self.dirty
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.tag, self.distance, self.node)?;
        if self.dirty {
            write!(f, "-dirty")?;
        }
        Ok(())
    }
}
