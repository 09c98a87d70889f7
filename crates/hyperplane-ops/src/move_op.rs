//! Blocking move primitive.

use std::fs;
use std::path::Path;

use hyperplane_core::OpsError;

use crate::copy::{calculate_totals, copy_item, remove_item};

/// Move a single item (file or directory).
///
/// Tries a rename first (fast path on the same filesystem) and falls back to
/// copy then removal of the source, which also covers entries in the trash
/// and cross-device moves.
pub(crate) fn move_item(source: &Path, dest: &Path) -> Result<u64, OpsError> {
    let (_, size) = calculate_totals(source);

    match fs::rename(source, dest) {
        Ok(()) => return Ok(size),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OpsError::io(source, e));
        }
        Err(e) => {
            tracing::debug!(
                source = %source.display(),
                error = %e,
                "rename failed, falling back to copy and remove"
            );
        }
    }

    let bytes = copy_item(source, dest)?;
    remove_item(source)?;

    Ok(bytes)
}
