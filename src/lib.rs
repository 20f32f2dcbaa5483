//! Version and file discovery from version control.
//!
//! A [backend::Backend] answers repository queries for one tool at one
//! location. [registry] picks the preferred valid backend for a location,
//! [versioning] turns its tags into a version string, and [plugin] wraps both
//! for packaging tools.
//!
//! ```rust,no_run
//! use vcs_version::registry::get_first_valid_manager;
//! use vcs_version::versioning::Versioning;
//!
//! # fn main() -> vcs_version::Result<()> {
//! let repo = get_first_valid_manager(".")?;
//! println!("{}", repo.get_current_version(None)?);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod capture;
pub mod config;
pub mod domain;
pub mod error;
pub mod exec;
pub mod plugin;
pub mod registry;
pub mod ui;
pub mod versioning;
pub mod warning;

pub use error::{Result, VcsError};
