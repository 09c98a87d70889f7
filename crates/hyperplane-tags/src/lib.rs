//! Tag namespace projection for hyperplane.
//!
//! Tags are plain directories directly below the home root, and an entry
//! carries every tag whose directory it sits under. This crate turns that
//! layout into a virtual hierarchy addressed by tag paths such as
//! `//work//urgent//`.
//!
//! # Example
//!
//! ```rust,no_run
//! use hyperplane_tags::{Entry, HyperplaneConfig, TagProjector, TagSet};
//!
//! let projector = TagProjector::new(&HyperplaneConfig::new("/home/user/Hyperplane"));
//!
//! for entry in projector.enumerate(&TagSet::parse("//work//urgent//")).unwrap() {
//!     match entry {
//!         Entry::Item(path) => println!("{}", path.display()),
//!         Entry::Tag(tag) => println!("+ {tag}"),
//!     }
//! }
//! ```

mod projector;

pub use projector::{Entry, TagEntries, TagProjector};

// Re-export core types for convenience
pub use hyperplane_core::{HyperplaneConfig, OpsError, TagName, TagSet};
