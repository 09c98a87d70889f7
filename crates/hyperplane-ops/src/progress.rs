//! Progress and completion types for background operations.

use std::path::PathBuf;

use hyperplane_core::OpsError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::OPERATION_CHANNEL_SIZE;

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Copy,
    Move,
    Delete,
    Restore,
    Purge,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
            Self::Delete => write!(f, "Delete"),
            Self::Restore => write!(f, "Restore"),
            Self::Purge => write!(f, "Purge"),
        }
    }
}

/// Progress information for an ongoing operation.
#[derive(Debug, Clone)]
pub struct OperationProgress {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of files completed.
    pub files_completed: usize,
    /// Total number of files to process.
    pub files_total: usize,
    /// Number of bytes processed so far.
    pub bytes_processed: u64,
    /// Total bytes to process (may be 0 if unknown).
    pub bytes_total: u64,
    /// The entry currently being processed.
    pub current_file: Option<PathBuf>,
}

impl OperationProgress {
    /// Create a new progress tracker for an operation.
    pub fn new(operation_type: OperationType, files_total: usize, bytes_total: u64) -> Self {
        Self {
            operation_type,
            files_completed: 0,
            files_total,
            bytes_processed: 0,
            bytes_total,
            current_file: None,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.bytes_total > 0 {
            (self.bytes_processed as f64 / self.bytes_total as f64) * 100.0
        } else if self.files_total > 0 {
            (self.files_completed as f64 / self.files_total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Update the current entry being processed.
    pub fn set_current_file(&mut self, path: Option<PathBuf>) {
        self.current_file = path;
    }

    /// Mark every file done and record the bytes moved.
    pub fn finish(&mut self, bytes: u64) {
        self.files_completed = self.files_total;
        self.bytes_processed = bytes;
    }
}

/// Result of a completed operation.
#[derive(Debug, Clone)]
pub struct OperationComplete {
    /// The type of operation.
    pub operation_type: OperationType,
    /// The entry the operation acted on.
    pub source: PathBuf,
    /// Where the entry ended up, for transfers.
    pub destination: Option<PathBuf>,
    /// Total bytes processed.
    pub bytes_processed: u64,
    /// The operation decided to do nothing (e.g. a restore onto an occupied path).
    pub skipped: bool,
}

impl OperationComplete {
    /// A completed operation that touched `source`.
    pub fn new(operation_type: OperationType, source: PathBuf) -> Self {
        Self {
            operation_type,
            source,
            destination: None,
            bytes_processed: 0,
            skipped: false,
        }
    }

    /// Set the destination.
    pub fn with_destination(mut self, destination: PathBuf) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Set the bytes processed.
    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes_processed = bytes;
        self
    }

    /// Mark the operation as skipped.
    pub fn skipped(mut self) -> Self {
        self.skipped = true;
        self
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        if self.skipped {
            return format!("{} skipped: {}", self.operation_type, self.source.display());
        }

        let action = match self.operation_type {
            OperationType::Copy => "Copied",
            OperationType::Move => "Moved",
            OperationType::Delete => "Deleted",
            OperationType::Restore => "Restored",
            OperationType::Purge => "Purged",
        };

        match self.destination {
            Some(ref destination) => format!(
                "{} {} to {}",
                action,
                self.source.display(),
                destination.display()
            ),
            None => format!("{} {}", action, self.source.display()),
        }
    }
}

/// Message sent through an operation's channel.
#[derive(Debug)]
pub enum OperationResult {
    /// Progress update.
    Progress(OperationProgress),
    /// The operation finished. Always the last message.
    Complete(Result<OperationComplete, OpsError>),
}

/// Handle to an operation running on a background task.
///
/// Dropping it does not cancel the work.
#[derive(Debug)]
pub struct PendingOperation {
    rx: mpsc::Receiver<OperationResult>,
}

impl PendingOperation {
    /// Create a pending operation and the sender that feeds it.
    pub(crate) fn channel() -> (mpsc::Sender<OperationResult>, Self) {
        let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);
        (tx, Self { rx })
    }

    /// A pending operation that has already finished.
    pub(crate) fn completed(result: Result<OperationComplete, OpsError>) -> Self {
        let (tx, pending) = Self::channel();
        // The channel is fresh, so there is room for one message.
        let _ = tx.try_send(OperationResult::Complete(result));
        pending
    }

    /// Receive the next progress or completion message.
    pub async fn recv(&mut self) -> Option<OperationResult> {
        self.rx.recv().await
    }

    /// Wait for the operation to finish, discarding progress updates.
    pub async fn wait(mut self) -> Result<OperationComplete, OpsError> {
        while let Some(result) = self.rx.recv().await {
            if let OperationResult::Complete(outcome) = result {
                return outcome;
            }
        }

        Err(OpsError::TaskFailed {
            message: "operation ended without reporting completion".into(),
        })
    }
}
