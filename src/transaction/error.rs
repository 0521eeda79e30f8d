//! Transaction error types.

use thiserror::Error;

use crate::snapshot::SnapshotError;
use crate::transaction::operation::Operation;

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Errors that can occur during transaction operations.
///
/// Every error is raised before any state changes, so a failed call leaves
/// the value and its open levels exactly as they were.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// No transaction level is open.
    #[error("cannot {op}; there is no current transaction")]
    NoOpenTransaction { op: Operation },

    /// The named level is not open.
    #[error("cannot {op} transaction {name:?} because it does not exist")]
    UnknownTransactionName { op: Operation, name: String },

    /// A level with this name is already open.
    #[error("named transactions must be unique: {0:?} is already open")]
    DuplicateTransactionName(String),

    /// The target level was opened before the running block started.
    #[error("cannot {op} transaction {name:?} started before the execution block")]
    CannotCrossBlockBoundary { op: Operation, name: String },

    /// Another caller holds the transaction lock.
    #[error("cannot obtain transaction lock for {op}")]
    LockUnavailable { op: Operation },

    /// Exclusions were changed after the first transaction started.
    #[error("transaction exclusions cannot change after the first transaction started")]
    ExclusionsFrozen,

    /// A block transaction was requested with no participants.
    #[error("cannot start a block transaction with no objects")]
    EmptyBlock,

    /// Capturing or restoring a checkpoint failed.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Block signal: abort the running block. Consumed by the block runner.
    #[error("transaction aborted")]
    Aborted,

    /// Block signal: commit the running block. Consumed by the block runner.
    #[error("transaction committed")]
    Committed,
}

impl TransactionError {
    /// Check if this is a block exit signal rather than a failure.
    pub fn is_signal(&self) -> bool {
        matches!(self, TransactionError::Aborted | TransactionError::Committed)
    }

    /// Check if retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransactionError::LockUnavailable { .. })
    }

    /// Operation that failed, where known.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            TransactionError::NoOpenTransaction { op }
            | TransactionError::UnknownTransactionName { op, .. }
            | TransactionError::CannotCrossBlockBoundary { op, .. }
            | TransactionError::LockUnavailable { op } => Some(*op),
            TransactionError::DuplicateTransactionName(_) => Some(Operation::Start),
            TransactionError::Aborted => Some(Operation::Abort),
            TransactionError::Committed => Some(Operation::Commit),
            _ => None,
        }
    }

    pub(crate) fn unknown(op: Operation, name: &str) -> Self {
        Self::UnknownTransactionName {
            op,
            name: name.to_string(),
        }
    }
}
