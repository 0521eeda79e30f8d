//! Transaction management for in-memory values.
//!
//! This module implements nested, optionally named transactions over any
//! value with a [`Snapshotter`](crate::snapshot::Snapshotter). Each level
//! keeps a checkpoint of the value taken when it opened; rewinding or
//! aborting copies that checkpoint back onto the live value.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Transactional                         │
//! │     (open? / name / start / rewind / abort / commit)        │
//! └─────────────────────────────────────────────────────────────┘
//!        ▲                     ▲                     ▲
//!        │                     │                     │
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │  run_block  │       │    Group    │       │ ThreadSafe  │
//!  │ (scoped tx) │       │  (fan-out)  │       │ (try_lock)  │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//!        │                     │                     │
//!        └──────────── TransactionControl ───────────┘
//!                              │
//!                              ▼
//!                     ┌──────────────────┐
//!                     │ TransactionStack │
//!                     │  (checkpoints)   │
//!                     └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use rewindable::Transactional;
//!
//! let mut value = Transactional::new(vec![1, 2, 3]);
//!
//! value.start(Some("outer"))?;
//! value.push(4);
//! value.start(None)?;
//! value.push(5);
//! value.commit(None)?;            // [1, 2, 3, 4, 5], "outer" still open
//! value.rewind(Some("outer"))?;   // [1, 2, 3], "outer" still open
//! value.commit(Some("outer"))?;
//! assert_eq!(*value, vec![1, 2, 3]);
//! # Ok::<(), rewindable::TransactionError>(())
//! ```

mod block;
mod config;
mod controller;
mod error;
mod group;
mod operation;
mod stack;
mod threadsafe;

pub use block::{run_block, BlockOutcome, BlockParticipants, BlockResolution, BlockSignal};
pub use config::TransactionConfig;
pub use controller::{TransactionControl, Transactional};
pub use error::{TransactionError, TransactionResult};
pub use group::Group;
pub use operation::Operation;
pub use stack::{CheckpointId, CheckpointInfo};
pub use threadsafe::ThreadSafe;
