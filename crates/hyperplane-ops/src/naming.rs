//! Collision-free names for paste-style duplication.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use hyperplane_core::OpsError;

/// How many candidate names are probed before giving up.
pub const COPY_PROBE_LIMIT: u32 = 10_000;

/// Generate the path a pasted duplicate of `path` should use.
///
/// For "report.txt", tries "report (copy).txt", then "report (copy 2).txt",
/// "report (copy 3).txt", etc. The filesystem is re-read on every probe.
pub fn next_available_name(path: &Path) -> Result<PathBuf, OpsError> {
    let parent = path.parent().unwrap_or(Path::new(""));

    for n in 1..=COPY_PROBE_LIMIT {
        let candidate = parent.join(copy_name(path, n));
        if !is_occupied(&candidate) {
            return Ok(candidate);
        }
    }

    Err(OpsError::NoAvailableName {
        path: path.to_path_buf(),
    })
}

/// The `n`th duplicate name for `path`. `n == 1` is the bare "(copy)" form.
fn copy_name(path: &Path, n: u32) -> OsString {
    let mut name = path.file_stem().map(OsString::from).unwrap_or_default();

    if n == 1 {
        name.push(" (copy)");
    } else {
        name.push(format!(" (copy {n})"));
    }

    if let Some(extension) = path.extension() {
        name.push(".");
        name.push(extension);
    }

    name
}

/// Any entry counts, including dangling symlinks.
fn is_occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
