//! User interface module - terminal output for the command line.
//!
//! - `formatter` - Formatting and display functions

pub mod formatter;

pub use formatter::{
    display_backends, display_description, display_error, display_files,
    display_status, display_tags, BackendReport,
};
