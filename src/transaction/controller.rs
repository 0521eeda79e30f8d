//! Transaction controller attached to a single value.
//!
//! [`Transactional`] owns a value together with its stack of open levels.
//! Opening a level captures the value; rewinding or aborting copies the
//! captured state back onto the live value, so the value is never moved or
//! replaced as a whole.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::snapshot::{
    CloneSnapshotter, ExclusionSet, JsonSnapshotter, Snapshotter, Transactable,
};
use crate::transaction::block::{run_block, BlockOutcome, BlockResolution, BlockSignal};
use crate::transaction::config::TransactionConfig;
use crate::transaction::error::{TransactionError, TransactionResult};
use crate::transaction::operation::Operation;
use crate::transaction::stack::{CheckpointId, CheckpointInfo, TransactionStack};

/// Object-safe view of a transaction controller.
///
/// Implemented by [`Transactional`], by the thread-safe wrapper and by
/// mutable references to either, so groups and blocks can drive values of
/// different types together.
pub trait TransactionControl {
    /// Number of open levels.
    fn transaction_level(&self) -> TransactionResult<usize>;

    /// Whether any level (or the named level) is open.
    fn transaction_open(&self, name: Option<&str>) -> TransactionResult<bool>;

    /// Name of the top level.
    fn transaction_name(&self) -> TransactionResult<Option<String>>;

    fn start_transaction(&mut self, name: Option<&str>) -> TransactionResult<CheckpointId>;

    fn rewind_transaction(&mut self, name: Option<&str>) -> TransactionResult<()>;

    fn abort_transaction(&mut self, name: Option<&str>) -> TransactionResult<()>;

    fn commit_transaction(&mut self, name: Option<&str>) -> TransactionResult<()>;

    /// Replace the block marker, returning the previous one.
    fn set_block_marker(&mut self, marker: Option<usize>) -> TransactionResult<Option<usize>>;

    /// Take the signal raised inside the block whose marker is `marker`.
    fn take_block_signal(&mut self, marker: usize) -> TransactionResult<Option<BlockSignal>>;
}

/// A value with nested, optionally named, transaction levels.
///
/// ```
/// use rewindable::Transactional;
///
/// let mut text = Transactional::new(String::from("Now is the time"));
/// text.start(None)?;
/// text.push_str(" for all good men");
/// text.abort(None)?;
/// assert_eq!(text.as_str(), "Now is the time");
/// # Ok::<(), rewindable::TransactionError>(())
/// ```
pub struct Transactional<T, S = CloneSnapshotter>
where
    S: Snapshotter<T>,
{
    value: T,
    snapshotter: S,
    stack: TransactionStack<S::Checkpoint>,
    exclusions: ExclusionSet,
    /// Set by the first start; freezes exclusions.
    started: bool,
    block: Option<usize>,
    /// Pending block signals, keyed by block marker.
    signals: Vec<(usize, BlockSignal)>,
    config: TransactionConfig,
}

impl<T> Transactional<T>
where
    T: Transactable + Clone,
{
    /// Wrap a value, capturing it with `Clone`.
    pub fn new(value: T) -> Self {
        Self::with_snapshotter(value, CloneSnapshotter)
    }
}

impl<T> Transactional<T, JsonSnapshotter>
where
    T: Transactable + Serialize + DeserializeOwned,
{
    /// Wrap a value, capturing it as JSON.
    pub fn json(value: T) -> Self {
        Self::with_snapshotter(value, JsonSnapshotter)
    }
}

impl<T, S> Transactional<T, S>
where
    T: Transactable,
    S: Snapshotter<T>,
{
    /// Wrap a value with a specific snapshotter.
    pub fn with_snapshotter(value: T, snapshotter: S) -> Self {
        Self {
            value,
            snapshotter,
            stack: TransactionStack::new(),
            exclusions: ExclusionSet::new(),
            started: false,
            block: None,
            signals: Vec::new(),
            config: TransactionConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: TransactionConfig) -> Self {
        self.config = config;
        self
    }

    /// Exclude fields from rollback.
    pub fn with_exclusions<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.exclusions.extend(fields);
        self
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Mutable access to the value. Edits made here are what rewind undoes.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Unwrap the value, dropping any open levels.
    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn snapshotter(&self) -> &S {
        &self.snapshotter
    }

    /// Fields excluded from rollback.
    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Edit the exclusion set. Fails once any transaction has started.
    pub fn exclusions_mut(&mut self) -> TransactionResult<&mut ExclusionSet> {
        if self.started {
            return Err(TransactionError::ExclusionsFrozen);
        }
        Ok(&mut self.exclusions)
    }

    /// Number of open levels.
    pub fn level(&self) -> usize {
        self.stack.depth()
    }

    /// Open levels, outermost first.
    pub fn checkpoints(&self) -> Vec<CheckpointInfo> {
        self.stack.info()
    }

    /// Check whether a transaction is open.
    ///
    /// Without a name, true if any level is open. With a name, true if a
    /// level with that name is open anywhere in the stack.
    pub fn is_open(&self, name: Option<&str>) -> bool {
        let open = match name {
            None => !self.stack.is_empty(),
            Some(name) => self.stack.contains(name),
        };
        let state = if open { "open" } else { "closed" };
        self.trace('>', format_args!("{} [{}]", Operation::Open.description(), state));
        open
    }

    /// Name of the innermost open level.
    pub fn name(&self) -> TransactionResult<Option<&str>> {
        let top = self.stack.top().ok_or(TransactionError::NoOpenTransaction {
            op: Operation::Name,
        })?;
        let name = top.name.as_deref();
        self.trace('|', format_args!("{}({:?})", Operation::Name.description(), name));
        Ok(name)
    }

    /// Open a new level on top of the current one.
    ///
    /// The current state is captured first; if capture fails no level is
    /// opened. Names must be unique among open levels.
    pub fn start(&mut self, name: Option<&str>) -> TransactionResult<CheckpointId> {
        if let Some(name) = name {
            if self.stack.contains(name) {
                return Err(TransactionError::DuplicateTransactionName(name.to_string()));
            }
        }

        let checkpoint = self.snapshotter.capture(&self.value)?;
        let id = self.stack.push(name.map(str::to_string), checkpoint);
        self.started = true;

        self.trace('>', format_args!("{}({:?})", Operation::Start.description(), name));
        self.trace_checkpoint();
        Ok(id)
    }

    /// Restore the value to the start of a level, keeping that level open.
    ///
    /// Without a name the innermost level is rewound. With a name, every
    /// level above the named one is discarded first, whatever its name.
    pub fn rewind(&mut self, name: Option<&str>) -> TransactionResult<&mut Self> {
        let op = Operation::Rewind;
        let level = self.target_level(op, name)?;
        let restored = self.restore_level(op, level)?;

        let top = self.stack.depth();
        let discarded = self.stack.truncate(level);
        for (depth, frame) in (level + 1..=top).rev().zip(&discarded) {
            self.trace_at(
                depth,
                '<',
                format_args!("{}({:?})", op.description(), frame.name.as_deref()),
            );
        }

        self.apply(restored);
        self.trace('|', format_args!("{}({:?})", op.description(), name));
        self.trace_checkpoint();
        Ok(self)
    }

    /// Restore the value to the start of a level and close it.
    ///
    /// Levels above the target are closed too. Inside a block, aborting the
    /// block's own level raises [`TransactionError::Aborted`] for the block
    /// runner instead.
    pub fn abort(&mut self, name: Option<&str>) -> TransactionResult<&mut Self> {
        let op = Operation::Abort;
        let level = self.target_level(op, name)?;
        if self.block == Some(level) {
            self.raise_signal(level, BlockSignal::Abort);
            return Err(TransactionError::Aborted);
        }
        let restored = self.restore_level(op, level)?;

        let top = self.stack.depth();
        let closed = self.stack.truncate(level - 1);
        for (depth, frame) in (level..=top).rev().zip(&closed) {
            self.trace_at(
                depth,
                '<',
                format_args!("{}({:?})", op.description(), frame.name.as_deref()),
            );
        }

        self.apply(restored);
        self.trace('|', format_args!("{}({:?})", op.description(), name));
        self.trace_checkpoint();
        Ok(self)
    }

    /// Close a level, keeping every edit made inside it.
    ///
    /// Levels above the target are committed too; their edits fold into the
    /// enclosing level. Inside a block, committing the block's own level
    /// raises [`TransactionError::Committed`] for the block runner instead.
    pub fn commit(&mut self, name: Option<&str>) -> TransactionResult<&mut Self> {
        let op = Operation::Commit;
        let level = self.target_level(op, name)?;
        if self.block == Some(level) {
            self.raise_signal(level, BlockSignal::Commit);
            return Err(TransactionError::Committed);
        }

        let top = self.stack.depth();
        let closed = self.stack.truncate(level - 1);
        for (depth, frame) in (level..=top).rev().zip(&closed) {
            self.trace_at(
                depth,
                '<',
                format_args!("{}({:?})", op.description(), frame.name.as_deref()),
            );
        }
        Ok(self)
    }

    /// Run `body` inside a block-scoped transaction on this value.
    ///
    /// See [`run_block`] for the exit rules.
    pub fn transaction<F>(&mut self, name: Option<&str>, body: F) -> TransactionResult<BlockResolution>
    where
        F: FnOnce(&mut Self) -> TransactionResult<BlockOutcome>,
    {
        run_block(self, name, |tx| body(&mut **tx))
    }

    // ==================== Internals ====================

    /// Resolve the 1-based level an operation targets.
    fn target_level(&self, op: Operation, name: Option<&str>) -> TransactionResult<usize> {
        if self.stack.is_empty() {
            return Err(TransactionError::NoOpenTransaction { op });
        }
        let name = match name {
            Some(name) => name,
            None => return Ok(self.stack.depth()),
        };

        let level = self
            .stack
            .position(name)
            .ok_or_else(|| TransactionError::unknown(op, name))?;
        if matches!(self.block, Some(marker) if level < marker) {
            return Err(TransactionError::CannotCrossBlockBoundary {
                op,
                name: name.to_string(),
            });
        }
        Ok(level)
    }

    /// Decode the checkpoint of a level without touching the live value.
    fn restore_level(&self, op: Operation, level: usize) -> TransactionResult<T> {
        let frame = self
            .stack
            .frame(level)
            .ok_or(TransactionError::NoOpenTransaction { op })?;
        Ok(self.snapshotter.restore(&frame.checkpoint)?)
    }

    fn apply(&mut self, restored: T) {
        self.value.assign_from(restored, &self.exclusions);
        self.value.after_restore();
    }

    fn raise_signal(&mut self, level: usize, signal: BlockSignal) {
        // the first signal raised inside a block decides it
        if !self.signals.iter().any(|(marker, _)| *marker == level) {
            self.signals.push((level, signal));
        }
        self.trace('|', format_args!("{} exits block", signal.operation().description()));
    }

    fn trace(&self, marker: char, args: fmt::Arguments<'_>) {
        self.trace_at(self.stack.depth(), marker, args);
    }

    fn trace_at(&self, depth: usize, marker: char, args: fmt::Arguments<'_>) {
        let sink = &self.config.sink;
        if !sink.enabled() {
            return;
        }
        let line = if depth > 0 {
            let prefix: String = std::iter::repeat(marker).take(depth).collect();
            format!("{} {}", prefix, args)
        } else {
            args.to_string()
        };
        sink.write_line(&line);
    }

    fn trace_checkpoint(&self) {
        if !self.config.trace_checkpoints {
            return;
        }
        if let Some(frame) = self.stack.top() {
            self.trace(
                '|',
                format_args!(
                    "Checkpoint {} captured {}",
                    frame.id,
                    frame.captured_at.to_rfc3339()
                ),
            );
        }
    }
}

impl<T, S> TransactionControl for Transactional<T, S>
where
    T: Transactable,
    S: Snapshotter<T>,
{
    fn transaction_level(&self) -> TransactionResult<usize> {
        Ok(self.level())
    }

    fn transaction_open(&self, name: Option<&str>) -> TransactionResult<bool> {
        Ok(self.is_open(name))
    }

    fn transaction_name(&self) -> TransactionResult<Option<String>> {
        Ok(self.name()?.map(str::to_string))
    }

    fn start_transaction(&mut self, name: Option<&str>) -> TransactionResult<CheckpointId> {
        self.start(name)
    }

    fn rewind_transaction(&mut self, name: Option<&str>) -> TransactionResult<()> {
        self.rewind(name).map(|_| ())
    }

    fn abort_transaction(&mut self, name: Option<&str>) -> TransactionResult<()> {
        self.abort(name).map(|_| ())
    }

    fn commit_transaction(&mut self, name: Option<&str>) -> TransactionResult<()> {
        self.commit(name).map(|_| ())
    }

    fn set_block_marker(&mut self, marker: Option<usize>) -> TransactionResult<Option<usize>> {
        Ok(std::mem::replace(&mut self.block, marker))
    }

    fn take_block_signal(&mut self, marker: usize) -> TransactionResult<Option<BlockSignal>> {
        let index = self.signals.iter().position(|(level, _)| *level == marker);
        Ok(index.map(|index| self.signals.remove(index).1))
    }
}

impl<C> TransactionControl for &mut C
where
    C: TransactionControl + ?Sized,
{
    fn transaction_level(&self) -> TransactionResult<usize> {
        (**self).transaction_level()
    }

    fn transaction_open(&self, name: Option<&str>) -> TransactionResult<bool> {
        (**self).transaction_open(name)
    }

    fn transaction_name(&self) -> TransactionResult<Option<String>> {
        (**self).transaction_name()
    }

    fn start_transaction(&mut self, name: Option<&str>) -> TransactionResult<CheckpointId> {
        (**self).start_transaction(name)
    }

    fn rewind_transaction(&mut self, name: Option<&str>) -> TransactionResult<()> {
        (**self).rewind_transaction(name)
    }

    fn abort_transaction(&mut self, name: Option<&str>) -> TransactionResult<()> {
        (**self).abort_transaction(name)
    }

    fn commit_transaction(&mut self, name: Option<&str>) -> TransactionResult<()> {
        (**self).commit_transaction(name)
    }

    fn set_block_marker(&mut self, marker: Option<usize>) -> TransactionResult<Option<usize>> {
        (**self).set_block_marker(marker)
    }

    fn take_block_signal(&mut self, marker: usize) -> TransactionResult<Option<BlockSignal>> {
        (**self).take_block_signal(marker)
    }
}

impl<T, S> Deref for Transactional<T, S>
where
    S: Snapshotter<T>,
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T, S> DerefMut for Transactional<T, S>
where
    S: Snapshotter<T>,
{
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T, S> fmt::Debug for Transactional<T, S>
where
    T: fmt::Debug,
    S: Snapshotter<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transactional")
            .field("value", &self.value)
            .field("level", &self.stack.depth())
            .field("exclusions", &self.exclusions)
            .field("block", &self.block)
            .finish()
    }
}
