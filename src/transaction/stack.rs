//! Per-value stack of open transaction levels.
//!
//! Level `n` (1-based) holds the checkpoint taken when it was started, i.e.
//! the state just before its edits. Checkpoints chain downward: closing level
//! `n` exposes level `n - 1` and its checkpoint again.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use ulid::Ulid;

/// Opaque token identifying one checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CheckpointId(Ulid);

impl CheckpointId {
    pub(crate) fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Time the id was minted, to millisecond precision.
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_string().to_lowercase())
    }
}

/// Read-only description of one open level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointInfo {
    pub id: CheckpointId,
    /// 1-based nesting level.
    pub level: usize,
    pub name: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// One open level.
pub(crate) struct Frame<C> {
    pub(crate) id: CheckpointId,
    pub(crate) name: Option<String>,
    pub(crate) checkpoint: C,
    pub(crate) captured_at: DateTime<Utc>,
}

/// Ordered checkpoints plus their names.
///
/// The level count is the stack depth and every frame carries its own name
/// slot, so names and levels can never drift apart.
pub(crate) struct TransactionStack<C> {
    frames: Vec<Frame<C>>,
}

impl<C> Default for TransactionStack<C> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<C> TransactionStack<C> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of open levels.
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// 1-based level of the named frame.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.frames
            .iter()
            .position(|frame| frame.name.as_deref() == Some(name))
            .map(|index| index + 1)
    }

    pub(crate) fn top(&self) -> Option<&Frame<C>> {
        self.frames.last()
    }

    /// Frame at a 1-based level.
    pub(crate) fn frame(&self, level: usize) -> Option<&Frame<C>> {
        level.checked_sub(1).and_then(|index| self.frames.get(index))
    }

    /// Open a new level. Callers check name uniqueness first.
    pub(crate) fn push(&mut self, name: Option<String>, checkpoint: C) -> CheckpointId {
        debug_assert!(name.as_deref().map_or(true, |n| !self.contains(n)));
        let id = CheckpointId::generate();
        self.frames.push(Frame {
            id,
            name,
            checkpoint,
            captured_at: Utc::now(),
        });
        id
    }

    /// Close every level above `level`, returning them top first.
    pub(crate) fn truncate(&mut self, level: usize) -> Vec<Frame<C>> {
        if level >= self.frames.len() {
            return Vec::new();
        }
        let mut closed: Vec<_> = self.frames.drain(level..).collect();
        closed.reverse();
        closed
    }

    pub(crate) fn info(&self) -> Vec<CheckpointInfo> {
        self.frames
            .iter()
            .enumerate()
            .map(|(index, frame)| CheckpointInfo {
                id: frame.id,
                level: index + 1,
                name: frame.name.clone(),
                captured_at: frame.captured_at,
            })
            .collect()
    }
}
