use crate::error::{Result, VcsError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn strict_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?(?:([ab])(\d+))?$").ok())
        .as_ref()
}

/// Prerelease stage, alpha sorting before beta
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrereleaseKind {
    Alpha,
    Beta,
}

/// Trailing prerelease marker of a strict version, such as `a1` or `b2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Prerelease {
    pub kind: PrereleaseKind,
    pub number: u32,
}

impl fmt::Display for Prerelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.kind {
            PrereleaseKind::Alpha => 'a',
            PrereleaseKind::Beta => 'b',
        };
        write!(f, "{}{}", marker, self.number)
    }
}

/// A strict version: three numeric components plus an optional prerelease.
///
/// Values are immutable; every arithmetic operation returns a new `Version`.
/// Ordering compares the numeric triple first, and a prerelease sorts before
/// the release with the same triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
    prerelease: Option<Prerelease>,
}

impl Version {
    /// Create a release version from its three components
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    /// Create a version carrying a prerelease marker
    pub fn with_prerelease(major: u32, minor: u32, patch: u32, prerelease: Prerelease) -> Self {
        Version {
            major,
            minor,
            patch,
            prerelease: Some(prerelease),
        }
    }

    /// Parse a strict version string: `MAJOR.MINOR[.PATCH][(a|b)N]`.
    ///
    /// A missing patch component is zero. Anything else (prefixes, a fourth
    /// component, free-form suffixes) is rejected.
    ///
    /// # Example
    /// ```
    /// use vcs_version::domain::Version;
    ///
    /// assert_eq!(Version::parse("1.10").unwrap(), Version::new(1, 10, 0));
    /// assert!(Version::parse("v1.0").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let captures = strict_pattern()
            .and_then(|re| re.captures(text))
            .ok_or_else(|| VcsError::version(format!("'{}' is not a strict version", text)))?;

        let number = |index: usize| -> Result<u32> {
            match captures.get(index) {
                Some(m) => m.as_str().parse::<u32>().map_err(|_| {
                    VcsError::version(format!(
                        "component '{}' of '{}' is out of range",
                        m.as_str(),
                        text
                    ))
                }),
                None => Ok(0),
            }
        };

        let prerelease = match captures.get(4) {
            Some(kind) => Some(Prerelease {
                kind: if kind.as_str() == "a" {
                    PrereleaseKind::Alpha
                } else {
                    PrereleaseKind::Beta
                },
                number: number(5)?,
            }),
            None => None,
        };

        Ok(Version {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            prerelease,
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn patch(&self) -> u32 {
        self.patch
    }

    pub fn prerelease(&self) -> Option<Prerelease> {
        self.prerelease
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// The numeric `(major, minor, patch)` triple
    pub fn triple(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }

    /// The same version without its prerelease marker
    pub fn without_prerelease(&self) -> Self {
        Version::new(self.major, self.minor, self.patch)
    }

    /// Component-wise sum with an increment. Components never carry into
    /// each other: `1.9.3 + patch` is `1.9.4` and `3.0.9 + patch` is `3.0.10`.
    pub fn add(&self, increment: Increment) -> Self {
        let [major, minor, patch] = increment.components();
        Version {
            major: self.major.saturating_add(major),
            minor: self.minor.saturating_add(minor),
            patch: self.patch.saturating_add(patch),
            prerelease: self.prerelease,
        }
    }

    /// Zero every component less significant than the one `significance` bumps.
    ///
    /// ```
    /// use vcs_version::domain::{Increment, Version};
    ///
    /// let reset = Version::new(3, 1, 2).reset_less_significant(Increment::Minor);
    /// assert_eq!(reset, Version::new(3, 1, 0));
    /// ```
    pub fn reset_less_significant(&self, significance: Increment) -> Self {
        let keep = significance.position() + 1;
        let components = [self.major, self.minor, self.patch];
        let mut reset = [0u32; 3];
        reset[..keep].copy_from_slice(&components[..keep]);

        Version {
            major: reset[0],
            minor: reset[1],
            patch: reset[2],
            prerelease: self.prerelease,
        }
    }
}

impl FromStr for Version {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple()
            .cmp(&other.triple())
            .then_with(|| match (self.prerelease, other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(&b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)?;
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        }
        if let Some(prerelease) = self.prerelease {
            write!(f, "{}", prerelease)?;
        }
        Ok(())
    }
}

/// Which component of a version to bump.
///
/// Arithmetically an increment is the triple with a single 1 in the bumped
/// position: `(1,0,0)`, `(0,1,0)` or `(0,0,1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Increment {
    Major,
    Minor,
    #[default]
    Patch,
}

impl Increment {
    pub fn components(self) -> [u32; 3] {
        match self {
            Increment::Major => [1, 0, 0],
            Increment::Minor => [0, 1, 0],
            Increment::Patch => [0, 0, 1],
        }
    }

    /// Index of the rightmost non-zero component
    fn position(self) -> usize {
        match self {
            Increment::Major => 0,
            Increment::Minor => 1,
            Increment::Patch => 2,
        }
    }

    /// The increment viewed as a version value, e.g. `0.0.1` for patch
    pub fn as_version(self) -> Version {
        let [major, minor, patch] = self.components();
        Version::new(major, minor, patch)
    }
}

impl FromStr for Increment {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" | "1" | "1.0" | "1.0.0" => Ok(Increment::Major),
            "minor" | "0.1" | "0.1.0" => Ok(Increment::Minor),
            "patch" | "0.0.1" => Ok(Increment::Patch),
            other => Err(VcsError::version(format!(
                "Invalid increment '{}': expected major, minor, patch, 1.0, 0.1 or 0.0.1",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Increment {
    type Error = VcsError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Increment> for String {
    fn from(increment: Increment) -> Self {
        increment.to_string()
    }
}

impl fmt::Display for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Increment::Major => write!(f, "major"),
            Increment::Minor => write!(f, "minor"),
            Increment::Patch => write!(f, "patch"),
        }
    }
}

/// Guess the version that follows `last` for the given increment.
///
/// A prerelease has not been released yet, so its successor is simply its
/// release form and the increment is not applied. Otherwise the increment is
/// added and every less significant component is zeroed.
pub fn infer_next_version(last: &Version, increment: Increment) -> Version {
    if last.is_prerelease() {
        return last.without_prerelease();
    }
    last.add(increment).reset_less_significant(increment)
}
