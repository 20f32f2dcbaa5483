use crate::backend::{lenient_semver, output_lines, supports, Backend};
use crate::domain::{parse_tag_listing, Description, TaggedRevision};
use crate::error::{Result, VcsError};
use crate::exec::CommandRunner;
use chrono::{DateTime, FixedOffset};
use log::debug;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const MIN_HG_VERSION: &str = ">=2.0.0";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Mercurial through the `hg` executable
#[derive(Debug, Clone)]
pub struct MercurialCommand {
    location: PathBuf,
    runner: CommandRunner,
}

impl MercurialCommand {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self::with_exe(location, "hg")
    }

    /// Use a specific hg executable
    ///
    /// The child runs with `HGPLAIN` set so user configuration cannot change
    /// output formats, and without `MACOSX_DEPLOYMENT_TARGET`, which breaks
    /// hg installations built against a different deployment target.
    pub fn with_exe(location: impl Into<PathBuf>, exe: impl Into<String>) -> Self {
        MercurialCommand {
            location: location.into(),
            runner: CommandRunner::new(exe)
                .with_env("HGPLAIN", "1")
                .without_env("MACOSX_DEPLOYMENT_TARGET"),
        }
    }

    /// Run hg with `args` in the bound location
    pub fn invoke(&self, args: &[&str]) -> Result<String> {
        self.runner.run(&self.location, args)
    }

    /// Extract the version number from `hg version` output
    pub fn parse_version(output: &str) -> Option<String> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        PATTERN
            .get_or_init(|| Regex::new(r"Mercurial Distributed SCM \((?:version )?(.*?)\)").ok())
            .as_ref()?
            .captures(output)
            .map(|c| c[1].to_string())
    }

    /// Numeric id of `rev`, with a trailing `+` when the working copy is
    /// modified
    fn rev_num(&self, rev: Option<&str>) -> Result<String> {
        let mut args = vec!["identify", "--num", "--config", "defaults.identify="];
        if let Some(rev) = rev {
            args.extend(["--rev", rev]);
        }
        Ok(self.invoke(&args)?.trim().to_string())
    }

    fn tags_for_revset(&self, spec: &str) -> Result<Vec<TaggedRevision>> {
        let output = self.invoke(&[
            "log",
            "--style",
            "default",
            "--config",
            "defaults.log=",
            "-r",
            spec,
        ])?;
        Ok(parse_tagged_log(&output))
    }
}

fn header_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\w+?):\s+(.*)$").ok())
        .as_ref()
}

/// Collect `tag:` headers of default-style log output, each paired with the
/// `changeset:` header of the entry it belongs to
pub fn parse_tagged_log(output: &str) -> Vec<TaggedRevision> {
    let Some(pattern) = header_pattern() else {
        return Vec::new();
    };

    let mut revision = String::new();
    let mut tagged = Vec::new();
    for captures in output.lines().filter_map(|line| pattern.captures(line)) {
        match &captures[1] {
            "changeset" => revision = captures[2].trim().to_string(),
            "tag" => tagged.push(TaggedRevision::new(captures[2].trim(), revision.clone())),
            _ => {}
        }
    }
    tagged
}

/// Local revision numbers of the changesets in `hg parents` output
pub fn parse_parents(output: &str) -> Vec<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(pattern) = PATTERN
        .get_or_init(|| Regex::new(r"(?m)^changeset:\s+(\d+):[0-9a-zA-Z]+").ok())
        .as_ref()
    else {
        return Vec::new();
    };
    pattern
        .captures_iter(output)
        .map(|c| c[1].to_string())
        .collect()
}

/// Sub-repository paths declared in an `.hgsub` file
pub fn parse_hgsub(content: &str) -> Vec<String> {
    output_lines(content)
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| {
            let path = line.split('=').next()?.trim();
            (!path.is_empty()).then(|| path.to_string())
        })
        .collect()
}

impl Backend for MercurialCommand {
    fn name(&self) -> &'static str {
        "hg"
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn marker(&self) -> &'static str {
        ".hg"
    }

    fn is_valid(&self) -> bool {
        let Some(version) = self.tool_version() else {
            debug!("hg: no usable `{}` executable", self.runner.exe());
            return false;
        };
        if !supports(&version, MIN_HG_VERSION) {
            debug!("hg: version {} does not satisfy {}", version, MIN_HG_VERSION);
            return false;
        }
        self.invoke(&["status"]).is_ok()
    }

    fn find_root(&self) -> Option<PathBuf> {
        let root = self.invoke(&["root"]).ok()?;
        let root = root.trim();
        (!root.is_empty()).then(|| PathBuf::from(root))
    }

    fn find_files(&self) -> Result<Vec<String>> {
        let output = self.invoke(&["locate", "-I", ".", "--config", "ui.relative-paths=yes"])?;
        Ok(output_lines(&output).map(str::to_string).collect())
    }

    fn get_tags(&self, rev: Option<&str>) -> Result<BTreeSet<String>> {
        let rev_num = self.rev_num(rev)?;
        if rev_num.ends_with('+') {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .tags_for_revset(&rev_num)?
            .into_iter()
            .map(|tagged| tagged.tag)
            .collect())
    }

    fn get_repo_tags(&self) -> Result<Vec<TaggedRevision>> {
        Ok(parse_tag_listing(&self.invoke(&["tags"])?))
    }

    fn get_parent_revs(&self, rev: Option<&str>) -> Result<Vec<String>> {
        let mut args = vec!["parents", "--style", "default", "--config", "defaults.parents="];
        if let Some(rev) = rev {
            args.extend(["--rev", rev]);
        }
        Ok(parse_parents(&self.invoke(&args)?))
    }

    fn get_ancestral_tags(&self, rev: Option<&str>) -> Result<Vec<TaggedRevision>> {
        let spec = format!("sort(ancestors({}), -date)", rev.unwrap_or("."));
        self.tags_for_revset(&spec)
    }

    fn is_modified(&self) -> Result<bool> {
        let output = self.invoke(&["status", "-mard"])?;
        Ok(!output.trim().is_empty())
    }

    fn sub_paths(&self) -> Result<Vec<String>> {
        match fs::read_to_string(self.location.join(".hgsub")) {
            Ok(content) => Ok(parse_hgsub(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn subrepo(&self, location: PathBuf) -> Box<dyn Backend> {
        Box::new(MercurialCommand {
            location,
            runner: self.runner.clone(),
        })
    }

    fn get_timestamp(&self, rev: Option<&str>) -> Result<DateTime<FixedOffset>> {
        let rev = rev.unwrap_or(".");
        let output = self.invoke(&[
            "log",
            "-l",
            "1",
            "--template",
            "{date|isodatesec}",
            "-r",
            rev,
        ])?;
        let output = output.trim();
        DateTime::parse_from_str(output, TIMESTAMP_FORMAT)
            .map_err(|e| VcsError::output("hg", format!("bad commit date '{}': {}", output, e)))
    }

    fn describe_version(&self) -> Result<Description> {
        let output = self.invoke(&[
            "log",
            "-r",
            ".",
            "--config",
            "defaults.log=",
            "--template",
            "{latesttag}\n{latesttagdistance}\n{node|short}\n",
        ])?;
        let mut fields = output.lines().map(str::trim);
        let (Some(tag), Some(distance), Some(node)) = (fields.next(), fields.next(), fields.next())
        else {
            let detail = format!("bad describe output '{}'", output.trim());
            return Err(VcsError::output("hg", detail));
        };
        if tag == "null" {
            return Err(VcsError::NoVersionTags);
        }
        let distance = distance.parse::<u32>().map_err(|e| {
            VcsError::output("hg", format!("bad tag distance '{}': {}", distance, e))
        })?;

        Ok(Description {
            tag: tag.to_string(),
            distance,
            node: node.to_string(),
            dirty: self.is_modified()?,
            date: self.get_timestamp(None)?,
        })
    }

    fn tool_version(&self) -> Option<semver::Version> {
        let output = self.invoke(&["version"]).ok()?;
        let first = output.lines().next()?;
        lenient_semver(&Self::parse_version(first)?)
    }
}
