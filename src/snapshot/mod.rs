//! State capture for transactional values.
//!
//! A checkpoint is a full, independent copy of a value taken when a
//! transaction level opens. Rolling back rebuilds a fresh value from the
//! checkpoint and copies it onto the live value field by field, so anything
//! holding a reference to the live value keeps seeing the same object.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  capture   ┌──────────────┐
//! │    live value    │──────────▶ │  Checkpoint  │
//! │  (Transactable)  │            │   (opaque)   │
//! └──────────────────┘            └──────────────┘
//!          ▲                              │
//!          │ assign_from + after_restore  │ restore
//!          │                              ▼
//!          │                      ┌──────────────┐
//!          └──────────────────────│ fresh value  │
//!                                 └──────────────┘
//! ```
//!
//! Two codecs are provided: [`CloneSnapshotter`] for types whose `Clone` is a
//! deep copy, and [`JsonSnapshotter`] for serde types.

mod codec;
mod error;
mod restore;

pub use codec::{CloneSnapshotter, JsonCheckpoint, JsonSnapshotter, Snapshotter};
pub use error::{SnapshotError, SnapshotResult};
pub use restore::{ExclusionSet, Transactable};
