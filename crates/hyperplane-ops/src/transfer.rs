//! Background copy, move, delete and trash-restore operations.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use hyperplane_core::{FileHandle, HyperplaneConfig, OpsError, PathResolver, TagName, TagSet};

use crate::copy::{calculate_totals, copy_item, remove_item};
use crate::events::{EventPublisher, FsEvent};
use crate::move_op::move_item;
use crate::progress::{
    OperationComplete, OperationProgress, OperationResult, OperationType, PendingOperation,
};
use crate::trash::{TrashIndex, TrashRecord};

/// Schedules filesystem work on the tokio blocking pool.
///
/// Preconditions (destination must not exist, missing ancestors get created)
/// are checked on the calling thread; everything that moves bytes runs in the
/// background and reports through a [`PendingOperation`]. There is no locking
/// between operations: two requests racing for the same destination may both
/// pass the precondition.
///
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct TransferEngine {
    home: PathBuf,
    resolver: PathResolver,
    trash: TrashIndex,
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("home", &self.home)
            .field("resolver", &self.resolver)
            .field("trash", &self.trash)
            .finish_non_exhaustive()
    }
}

/// What a transfer has to announce once it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TagLocation {
    tags: TagSet,
    location: PathBuf,
}

impl TransferEngine {
    /// Create an engine publishing to `events`.
    pub fn new(config: &HyperplaneConfig, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            home: config.home.clone(),
            resolver: PathResolver::new(config),
            trash: TrashIndex::new(config),
            events,
        }
    }

    /// The trash index used for restores.
    pub fn trash(&self) -> &TrashIndex {
        &self.trash
    }

    /// Copy `src` to `dst`. Directories are copied recursively.
    ///
    /// Fails immediately with `AlreadyExists` if `dst` exists, and with
    /// `DestinationInsideSource` if `dst` lies within `src`. If `affects_tags`
    /// is set and `dst`'s parent had to be created, a
    /// [`FsEvent::TagLocationCreated`] is published when the copy finishes.
    pub fn copy(
        &self,
        src: impl Into<PathBuf>,
        dst: impl Into<PathBuf>,
        affects_tags: bool,
    ) -> Result<PendingOperation, OpsError> {
        let (src, dst) = (src.into(), dst.into());
        let tag_location = self.prepare(Some(&src), &dst, affects_tags)?;

        tracing::debug!(src = %src.display(), dst = %dst.display(), "scheduling copy");
        Ok(self.spawn(OperationType::Copy, src.clone(), tag_location, move || {
            let bytes = copy_item(&src, &dst)?;
            Ok(OperationComplete::new(OperationType::Copy, src)
                .with_destination(dst)
                .with_bytes(bytes))
        }))
    }

    /// Move `src` to `dst`.
    ///
    /// Same preconditions and notifications as [`copy`](Self::copy). The
    /// source is renamed when possible, otherwise copied and then removed.
    pub fn move_to(
        &self,
        src: impl Into<PathBuf>,
        dst: impl Into<PathBuf>,
        affects_tags: bool,
    ) -> Result<PendingOperation, OpsError> {
        let (src, dst) = (src.into(), dst.into());
        let tag_location = self.prepare(Some(&src), &dst, affects_tags)?;

        tracing::debug!(src = %src.display(), dst = %dst.display(), "scheduling move");
        Ok(self.spawn(OperationType::Move, src.clone(), tag_location, move || {
            let bytes = move_item(&src, &dst)?;
            Ok(OperationComplete::new(OperationType::Move, src)
                .with_destination(dst)
                .with_bytes(bytes))
        }))
    }

    /// Permanently delete `path`, recursively for directories. Bypasses the trash.
    pub fn delete(&self, path: impl Into<PathBuf>) -> PendingOperation {
        let path = path.into();

        tracing::debug!(path = %path.display(), "scheduling delete");
        self.spawn(OperationType::Delete, path.clone(), None, move || {
            let bytes = remove_item(&path)?;
            Ok(OperationComplete::new(OperationType::Delete, path).with_bytes(bytes))
        })
    }

    /// Restore the entry deleted from `original_path` at `deleted_at`.
    ///
    /// The trash lookup happens synchronously and fails with `NotFound` when
    /// no record matches. If `original_path` is occupied again, the restore
    /// completes as skipped and the trash record is kept.
    pub fn restore(
        &self,
        original_path: &Path,
        deleted_at: i64,
    ) -> Result<PendingOperation, OpsError> {
        let record = self.trash.lookup(original_path, deleted_at)?;

        match self.prepare(None, &record.original_path, false) {
            Ok(_) => {}
            Err(e) if e.is_already_exists() => {
                tracing::warn!(path = %record.original_path.display(), "original path occupied, not restoring");
                return Ok(PendingOperation::completed(Ok(skipped_restore(record))));
            }
            Err(e) => return Err(e),
        }

        let trash = self.trash.clone();
        Ok(self.spawn(
            OperationType::Restore,
            record.storage_path.clone(),
            None,
            move || finish_restore(&trash, record),
        ))
    }

    /// Restore the trashed entry behind `handle` (a `trash:///` handle).
    ///
    /// The trash attributes are read in the background; every failure,
    /// including an unknown handle, is reported through the operation.
    pub fn restore_handle(&self, handle: FileHandle) -> PendingOperation {
        let engine = self.clone();
        let current = PathBuf::from(handle.to_string());

        self.spawn(OperationType::Restore, current, None, move || {
            let record = engine.query_trash_record(&handle)?;

            match engine.prepare(None, &record.original_path, false) {
                Ok(_) => finish_restore(&engine.trash, record),
                Err(e) if e.is_already_exists() => {
                    tracing::warn!(path = %record.original_path.display(), "original path occupied, not restoring");
                    Ok(skipped_restore(record))
                }
                Err(e) => Err(e),
            }
        })
    }

    /// Permanently remove the trashed entry behind `handle` and its record.
    pub fn purge(&self, handle: FileHandle) -> PendingOperation {
        let engine = self.clone();
        let current = PathBuf::from(handle.to_string());

        self.spawn(OperationType::Purge, current, None, move || {
            let storage_path = engine.resolver.resolve(&handle)?;
            let original_path = handle
                .trash_name()
                .and_then(|name| engine.trash.record_for(&name).ok())
                .map(|record| record.original_path);

            let bytes = remove_item(&storage_path)?;
            if let Some(ref original_path) = original_path {
                engine.trash.remove_record(&storage_path, original_path);
            }

            Ok(OperationComplete::new(OperationType::Purge, storage_path).with_bytes(bytes))
        })
    }

    /// Check that `dst` is free and outside `src`, then make sure its parent exists.
    ///
    /// Returns the tag location to announce when the parent was missing and
    /// `affects_tags` is set.
    fn prepare(
        &self,
        src: Option<&Path>,
        dst: &Path,
        affects_tags: bool,
    ) -> Result<Option<TagLocation>, OpsError> {
        if dst.symlink_metadata().is_ok() {
            return Err(OpsError::already_exists(dst));
        }
        if let Some(src) = src.filter(|src| is_inside(src, dst)) {
            return Err(OpsError::DestinationInsideSource {
                path: src.to_path_buf(),
                destination: dst.to_path_buf(),
            });
        }

        let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(None);
        };
        if parent.is_dir() {
            return Ok(None);
        }

        std::fs::create_dir_all(parent).map_err(|e| OpsError::io(parent, e))?;

        if !affects_tags {
            return Ok(None);
        }

        let location = tag_location(&self.home, dst);
        if location.is_none() {
            tracing::warn!(dst = %dst.display(), "tagged destination outside home");
        }
        Ok(location)
    }

    fn query_trash_record(&self, handle: &FileHandle) -> Result<TrashRecord, OpsError> {
        let name = handle
            .trash_name()
            .ok_or_else(|| OpsError::not_found(handle.to_string()))?;
        let storage_path = self.resolver.resolve(handle)?;
        let record = self.trash.record_for(&name)?;

        Ok(TrashRecord {
            storage_path,
            ..record
        })
    }

    /// Run `work` on the blocking pool and report through a new channel.
    fn spawn<F>(
        &self,
        operation_type: OperationType,
        current: PathBuf,
        tag_location: Option<TagLocation>,
        work: F,
    ) -> PendingOperation
    where
        F: FnOnce() -> Result<OperationComplete, OpsError> + Send + 'static,
    {
        let (tx, pending) = PendingOperation::channel();
        let events = Arc::clone(&self.events);

        tokio::spawn(async move {
            let totals_for = current.clone();
            let (files_total, bytes_total) =
                tokio::task::spawn_blocking(move || calculate_totals(&totals_for))
                    .await
                    .unwrap_or_default();

            let mut progress = OperationProgress::new(operation_type, files_total, bytes_total);
            progress.set_current_file(Some(current));
            let _ = tx.send(OperationResult::Progress(progress.clone())).await;

            let result = match tokio::task::spawn_blocking(work).await {
                Ok(result) => result,
                Err(e) => Err(OpsError::TaskFailed {
                    message: e.to_string(),
                }),
            };

            match result {
                Ok(ref complete) => {
                    progress.finish(complete.bytes_processed);
                    let _ = tx.send(OperationResult::Progress(progress)).await;
                }
                Err(ref e) => {
                    tracing::warn!(operation = %operation_type, error = %e, "operation failed");
                }
            }

            // The parent directory exists either way, so the location is real.
            if let Some(TagLocation { tags, location }) = tag_location {
                events.publish(FsEvent::TagLocationCreated { tags, location });
            }

            let _ = tx.send(OperationResult::Complete(result)).await;
        });

        pending
    }
}

/// Move a trashed entry back and drop its record.
fn finish_restore(trash: &TrashIndex, record: TrashRecord) -> Result<OperationComplete, OpsError> {
    let bytes = move_item(&record.storage_path, &record.original_path)?;
    trash.remove_record(&record.storage_path, &record.original_path);

    Ok(OperationComplete::new(OperationType::Restore, record.storage_path)
        .with_destination(record.original_path)
        .with_bytes(bytes))
}

fn skipped_restore(record: TrashRecord) -> OperationComplete {
    OperationComplete::new(OperationType::Restore, record.storage_path)
        .with_destination(record.original_path)
        .skipped()
}

/// Whether `dst` would land inside the tree rooted at `src`.
///
/// Both sides are compared canonicalized. A final symlink in `src` is not
/// followed, and a missing source never counts as containing anything.
fn is_inside(src: &Path, dst: &Path) -> bool {
    let Ok(src) = std::path::absolute(src) else {
        return false;
    };
    let Some(src) = src
        .file_name()
        .zip(src.parent())
        .and_then(|(name, parent)| Some(canonical_prefix(parent)?.join(name)))
    else {
        return false;
    };
    if src.symlink_metadata().is_err() {
        return false;
    }

    canonical_prefix(dst).is_some_and(|dst| dst.starts_with(&src))
}

/// Canonicalize the deepest existing ancestor of `path` and re-attach the rest.
fn canonical_prefix(path: &Path) -> Option<PathBuf> {
    let path = std::path::absolute(path).ok()?;
    let mut existing = path.as_path();
    let mut missing = Vec::new();

    loop {
        if let Ok(base) = existing.canonicalize() {
            return Some(missing.iter().rev().fold(base, |acc, name| acc.join(name)));
        }
        missing.push(existing.file_name()?);
        existing = existing.parent()?;
    }
}

/// The tags spelled by the directories between `home` and `dst`.
fn tag_location(home: &Path, dst: &Path) -> Option<TagLocation> {
    let relative = dst.strip_prefix(home).ok()?.parent()?;

    let tags: TagSet = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(TagName::from(name.to_string_lossy().into_owned())),
            _ => None,
        })
        .collect();

    if tags.is_empty() {
        return None;
    }

    let location = tags
        .iter()
        .fold(home.to_path_buf(), |path, tag| path.join(tag.as_str()));

    Some(TagLocation { tags, location })
}
