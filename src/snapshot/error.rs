//! Snapshot codec error types.

use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur while capturing or restoring a checkpoint.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The live value could not be encoded into a checkpoint.
    #[error("failed to capture checkpoint: {0}")]
    Encode(#[source] serde_json::Error),

    /// A stored checkpoint could not be decoded back into a value.
    #[error("failed to restore checkpoint: {0}")]
    Decode(#[source] serde_json::Error),
}

impl SnapshotError {
    /// Check if this error happened while taking a checkpoint.
    pub fn is_capture(&self) -> bool {
        matches!(self, SnapshotError::Encode(_))
    }
}
