//! Domain logic - version arithmetic and tag data independent of any backend

pub mod describe;
pub mod tag;
pub mod version;

pub use describe::Description;
pub use tag::{best_version, parse_tag_listing, TaggedRevision};
pub use version::{infer_next_version, Increment, Prerelease, PrereleaseKind, Version};
