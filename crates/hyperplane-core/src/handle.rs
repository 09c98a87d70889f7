//! File handles and their resolution to local paths.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::config::HyperplaneConfig;
use crate::error::OpsError;

/// URI scheme of entries inside the trash.
pub const TRASH_SCHEME: &str = "trash";

/// An opaque reference to a filesystem entry.
///
/// Handles are cheap and never cached: every resolution re-reads the
/// filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileHandle {
    /// A local path.
    Path(PathBuf),
    /// A URI-addressed entry (`file://`, `trash://`, remote mounts, ...).
    Uri(Url),
}

impl FileHandle {
    /// Create a handle for a local path.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Parse a URI into a handle.
    pub fn for_uri(uri: &str) -> Result<Self, OpsError> {
        Url::parse(uri)
            .map(Self::Uri)
            .map_err(|_| OpsError::not_found(uri))
    }

    /// Create a handle for an entry stored in the trash under `name`.
    pub fn for_trash_entry(name: &str) -> Self {
        let uri = format!("{TRASH_SCHEME}:///{}", urlencoding::encode(name));
        match Url::parse(&uri) {
            Ok(url) => Self::Uri(url),
            // Unreachable for encoded names, but keep the handle usable.
            Err(_) => Self::Path(PathBuf::from(name)),
        }
    }

    /// The URI identity of this handle, if it has one.
    pub fn uri(&self) -> Option<Url> {
        match self {
            Self::Path(path) => std::path::absolute(path)
                .ok()
                .and_then(|path| Url::from_file_path(path).ok()),
            Self::Uri(url) => Some(url.clone()),
        }
    }

    /// The trash storage name if this handle points into the trash.
    pub fn trash_name(&self) -> Option<String> {
        match self {
            Self::Uri(url) if url.scheme() == TRASH_SCHEME => {
                let segments: Vec<String> = url
                    .path_segments()?
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| {
                        urlencoding::decode(segment)
                            .map(|s| s.into_owned())
                            .unwrap_or_else(|_| segment.to_string())
                    })
                    .collect();
                if segments.is_empty() {
                    None
                } else {
                    Some(segments.join("/"))
                }
            }
            _ => None,
        }
    }
}

impl From<PathBuf> for FileHandle {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for FileHandle {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Uri(url) => write!(f, "{url}"),
        }
    }
}

/// Where a handle lives: a local path or, failing that, a URI identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Uri(Url),
}

impl Location {
    /// The local path, if any.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Uri(_) => None,
        }
    }
}

/// Maps handles to canonical local paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    trash_files: PathBuf,
}

impl PathResolver {
    /// Create a resolver for the given configuration.
    pub fn new(config: &HyperplaneConfig) -> Self {
        Self {
            trash_files: config.trash_files_dir(),
        }
    }

    /// Resolve a handle to a local path.
    ///
    /// Trash URIs resolve to their storage path under `Trash/files`, and only
    /// while that storage entry exists.
    pub fn resolve(&self, handle: &FileHandle) -> Result<PathBuf, OpsError> {
        match handle {
            FileHandle::Path(path) => {
                std::path::absolute(path).map_err(|e| OpsError::io(path, e))
            }
            FileHandle::Uri(url) => self.resolve_uri(url),
        }
    }

    /// Resolve a handle, falling back to its URI identity when it has no local path.
    pub fn resolve_or_uri(&self, handle: &FileHandle) -> Result<Location, OpsError> {
        match self.resolve(handle) {
            Ok(path) => Ok(Location::Local(path)),
            Err(err) if err.is_not_found() => match handle {
                FileHandle::Uri(url) if url.scheme() != TRASH_SCHEME => {
                    Ok(Location::Uri(url.clone()))
                }
                _ => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    fn resolve_uri(&self, url: &Url) -> Result<PathBuf, OpsError> {
        match url.scheme() {
            "file" => url
                .to_file_path()
                .map_err(|()| OpsError::not_found(url.as_str())),
            TRASH_SCHEME => {
                let name = FileHandle::Uri(url.clone())
                    .trash_name()
                    .ok_or_else(|| OpsError::not_found(url.as_str()))?;
                let path = self.trash_files.join(name);
                if path.symlink_metadata().is_ok() {
                    Ok(path)
                } else {
                    Err(OpsError::not_found(path))
                }
            }
            _ => Err(OpsError::not_found(url.as_str())),
        }
    }
}
