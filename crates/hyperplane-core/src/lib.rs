//! Core types for hyperplane.
//!
//! This crate provides the data model shared by the operation engine and the
//! tag projector: file handles and their resolution, tag names and tag paths,
//! configuration, and the error taxonomy.

mod config;
mod error;
mod handle;
mod tag;

pub use config::{DATA_HOME_ENV, HyperplaneConfig, HyperplaneConfigBuilder};
pub use error::OpsError;
pub use handle::{FileHandle, Location, PathResolver, TRASH_SCHEME};
pub use tag::{TAG_SEPARATOR, TagName, TagSet};
