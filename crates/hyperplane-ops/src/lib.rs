//! File operations engine for hyperplane.
//!
//! This crate provides background copy, move, delete and trash-restore
//! operations reporting through channels, the trash record index, name
//! validation and collision-free duplicate naming.

mod copy;
mod events;
mod move_op;
mod naming;
mod progress;
mod transfer;
mod trash;
mod validate;

pub use events::{EVENT_CHANNEL_SIZE, EventBus, EventPublisher, FsEvent};
pub use naming::{COPY_PROBE_LIMIT, next_available_name};
pub use progress::{
    OperationComplete, OperationProgress, OperationResult, OperationType, PendingOperation,
};
pub use transfer::TransferEngine;
pub use trash::{TRASHINFO_EXTENSION, TrashIndex, TrashInfo, TrashRecord, decode_path};
pub use validate::{NameIssue, NameValidator, ValidationMessage, ValidationResult, validate_at};

// Re-export core types for convenience
pub use hyperplane_core::{FileHandle, HyperplaneConfig, OpsError, PathResolver, TagName, TagSet};

/// Default channel buffer size for operation progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
