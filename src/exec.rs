//! Subprocess execution for command-line backends.
//!
//! A [`CommandRunner`] invokes one executable in a given working directory
//! and returns its standard output. A non-zero exit becomes a
//! [`VcsError::Command`] carrying the trimmed standard error, or the trimmed
//! standard output when the tool wrote nothing to standard error.

use crate::error::{Result, VcsError};
use log::debug;
use std::path::Path;
use std::process::Command;

/// Invokes an external tool with a controlled environment
#[derive(Debug, Clone)]
pub struct CommandRunner {
    exe: String,
    removed_env: Vec<String>,
    added_env: Vec<(String, String)>,
}

impl CommandRunner {
    pub fn new(exe: impl Into<String>) -> Self {
        CommandRunner {
            exe: exe.into(),
            removed_env: Vec::new(),
            added_env: Vec::new(),
        }
    }

    /// Remove a variable from the child environment
    pub fn without_env(mut self, key: impl Into<String>) -> Self {
        self.removed_env.push(key.into());
        self
    }

    /// Set a variable in the child environment
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.added_env.push((key.into(), value.into()));
        self
    }

    pub fn exe(&self) -> &str {
        &self.exe
    }

    /// Render the command line for diagnostics
    pub fn render(&self, args: &[&str]) -> String {
        std::iter::once(self.exe.as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the tool in `location` and return its standard output
    pub fn run(&self, location: &Path, args: &[&str]) -> Result<String> {
        let rendered = self.render(args);
        debug!("running `{}` in {}", rendered, location.display());

        let mut command = Command::new(&self.exe);
        command.args(args).current_dir(location);
        for key in &self.removed_env {
            command.env_remove(key);
        }
        for (key, value) in &self.added_env {
            command.env(key, value);
        }

        let output = command
            .output()
            .map_err(|e| VcsError::command(&rendered, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr
            };
            debug!("`{}` exited with {}: {}", rendered, output.status, message);
            return Err(VcsError::command(rendered, message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
