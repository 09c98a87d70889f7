//! Blocking copy and removal primitives run on background threads.

use std::fs;
use std::path::{Path, PathBuf};

use hyperplane_core::OpsError;

/// Copy a single item (file or directory, recursively).
///
/// Returns the number of bytes copied.
pub(crate) fn copy_item(source: &Path, dest: &Path) -> Result<u64, OpsError> {
    let metadata = fs::metadata(source).map_err(|e| OpsError::io(source, e))?;

    if metadata.is_dir() {
        copy_dir_recursive(source, dest)
    } else {
        copy_file(source, dest)
    }
}

/// Copy a single file.
fn copy_file(source: &Path, dest: &Path) -> Result<u64, OpsError> {
    fs::copy(source, dest).map_err(|e| OpsError::io(source, e))
}

/// Recursively copy a directory.
///
/// The source listing is read before `dest` is created, so a `dest` directly
/// inside `source` is not copied into itself.
fn copy_dir_recursive(source: &Path, dest: &Path) -> Result<u64, OpsError> {
    let children: Vec<PathBuf> = fs::read_dir(source)
        .and_then(|entries| entries.map(|entry| entry.map(|e| e.path())).collect())
        .map_err(|e| OpsError::io(source, e))?;

    fs::create_dir(dest).map_err(|e| OpsError::io(dest, e))?;

    children.iter().try_fold(0u64, |total, child| {
        let Some(name) = child.file_name() else {
            return Ok(total);
        };
        Ok(total + copy_item(child, &dest.join(name))?)
    })
}

/// Permanently remove a file or directory tree. Symlinks are removed, not followed.
pub(crate) fn remove_item(path: &Path) -> Result<u64, OpsError> {
    let metadata = fs::symlink_metadata(path).map_err(|e| OpsError::io(path, e))?;
    let size = if metadata.is_dir() {
        calculate_totals(path).1
    } else {
        metadata.len()
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|e| OpsError::io(path, e))?;
    } else {
        fs::remove_file(path).map_err(|e| OpsError::io(path, e))?;
    }

    Ok(size)
}

/// Calculate total files and bytes below `path`.
pub(crate) fn calculate_totals(path: &Path) -> (usize, u64) {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => calculate_dir_totals(path),
        Ok(metadata) => (1, metadata.len()),
        Err(_) => (0, 0),
    }
}

/// Calculate totals for a directory recursively.
fn calculate_dir_totals(dir: &Path) -> (usize, u64) {
    let mut files = 0;
    let mut bytes = 0u64;

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.is_dir() {
                let (f, b) = calculate_dir_totals(&entry.path());
                files += f;
                bytes += b;
            } else {
                files += 1;
                bytes += metadata.len();
            }
        }
    }

    (files, bytes)
}
