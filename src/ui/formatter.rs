//! Formatting functions for terminal output.
//!
//! `format_*` functions build the text and are pure; `display_*` functions
//! print it. Styling goes through `console`, which drops colors when the
//! stream is not a terminal or colors are disabled.

use crate::domain::{Description, TaggedRevision};
use console::style;
use std::path::PathBuf;

/// One row of the backend table
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReport {
    pub name: &'static str,
    pub priority: i32,
    pub valid: bool,
    pub tool_version: Option<String>,
    pub root: Option<PathBuf>,
}

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    eprintln!("{} {}", style("→").yellow(), message);
}

pub fn format_backend(report: &BackendReport) -> String {
    let state = if report.valid {
        style("valid").green().to_string()
    } else {
        style("invalid").red().to_string()
    };
    let version = report.tool_version.as_deref().unwrap_or("-");
    let root = report
        .root
        .as_ref()
        .map(|root| root.display().to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<6} priority {:>2}  {:<7}  version {:<10} root {}",
        report.name, report.priority, state, version, root
    )
}

/// Display every known backend with its selection state.
///
/// The first valid backend is the one version queries use; it is marked
/// with an arrow.
pub fn display_backends(reports: &[BackendReport]) {
    println!("{}", style("Backends (selection order):").bold());
    let selected = reports.iter().position(|report| report.valid);
    for (i, report) in reports.iter().enumerate() {
        let marker = if Some(i) == selected { "→" } else { " " };
        println!("{} {}", marker, format_backend(report));
    }
}

pub fn format_tag(tagged: &TaggedRevision) -> String {
    let tag = match tagged.version() {
        Some(_) => style(&tagged.tag).cyan().to_string(),
        None => style(&tagged.tag).dim().to_string(),
    };
    format!("{} {}", tag, tagged.revision)
}

/// Display tags, most recent first. Strict-version tags are highlighted.
pub fn display_tags(tags: &[TaggedRevision]) {
    if tags.is_empty() {
        display_status("No tags found");
        return;
    }
    for tagged in tags {
        println!("{}", format_tag(tagged));
    }
}

/// Display tracked files, one per line.
pub fn display_files(files: &[String]) {
    for file in files {
        println!("{}", file);
    }
}

pub fn format_description(description: &Description) -> String {
    let mut text = format!(
        "{} ({} commit{} since, {})",
        style(&description.tag).bold(),
        description.distance,
        if description.distance == 1 { "" } else { "s" },
        description.node
    );
    if description.dirty {
        text.push_str(&format!(" {}", style("dirty").red()));
    }
    text.push_str(&format!(
        "\n  committed {}",
        description.date.format("%Y-%m-%d %H:%M:%S %:z")
    ));
    text
}

/// Display the result of describing the working copy.
pub fn display_description(description: &Description) {
    println!("{}", format_description(description));
}
