//! Rewindable - in-memory transactions for ordinary Rust values.
//!
//! This crate attaches a stack of checkpoints to a value. Transactions nest,
//! can be named, and can be rewound, aborted or committed at any level.
//! Block-scoped transactions commit automatically when their body finishes,
//! groups drive several values at once, and a fail-fast wrapper makes a
//! value shareable between threads.
//!
//! # Example
//!
//! ```
//! use rewindable::{BlockOutcome, Transactional};
//!
//! let mut balance = Transactional::new(100_i64);
//!
//! balance.transaction(None, |tx| {
//!     **tx -= 30;
//!     if **tx < 0 {
//!         return Ok(BlockOutcome::AbortRequested);
//!     }
//!     Ok(BlockOutcome::Continue)
//! })?;
//!
//! assert_eq!(*balance, 70);
//! # Ok::<(), rewindable::TransactionError>(())
//! ```

pub mod diagnostics;
pub mod snapshot;
pub mod transaction;

pub use snapshot::{
    CloneSnapshotter, ExclusionSet, JsonSnapshotter, SnapshotError, SnapshotResult, Snapshotter,
    Transactable,
};
pub use transaction::{
    run_block, BlockOutcome, BlockResolution, CheckpointId, CheckpointInfo, Group, Operation,
    ThreadSafe, TransactionConfig, TransactionControl, TransactionError, TransactionResult,
    Transactional,
};
