//! Block-scoped transactions.
//!
//! A block opens one level on every participant, runs a body, then closes
//! exactly those levels: committed when the body finishes normally, aborted
//! when it asks to abort or fails.
//!
//! ```text
//!   Running ──body Ok(Continue)────────────────▶ Committing ──▶ Done
//!      │    ──CommitRequested / Committed──────▶ Committing
//!      │    ──AbortRequested / Aborted─────────▶ Aborting   ──▶ Done
//!      └──────any other error──────────────────▶ Aborting   ──▶ Done (error returned)
//! ```
//!
//! Inside the body, `abort` or `commit` aimed at the block's own level does
//! not close it directly. The controller returns the matching signal error
//! (`Aborted` / `Committed`) which the body hands back with `?`, and the
//! runner closes the block's levels on every participant. Aiming at a level
//! opened before the block fails with `CannotCrossBlockBoundary`.

use crate::transaction::controller::TransactionControl;
use crate::transaction::error::{TransactionError, TransactionResult};
use crate::transaction::operation::Operation;

/// What the body wants done when it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockOutcome {
    /// Finished normally; commit the block.
    #[default]
    Continue,
    /// Abort the block on every participant.
    AbortRequested,
    /// Commit the block on every participant.
    CommitRequested,
}

/// How a block ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockResolution {
    Committed,
    Aborted,
}

/// Early exit raised from inside a block body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSignal {
    Abort,
    Commit,
}

impl BlockSignal {
    pub fn operation(&self) -> Operation {
        match self {
            BlockSignal::Abort => Operation::Abort,
            BlockSignal::Commit => Operation::Commit,
        }
    }

    pub fn resolution(&self) -> BlockResolution {
        match self {
            BlockSignal::Abort => BlockResolution::Aborted,
            BlockSignal::Commit => BlockResolution::Committed,
        }
    }
}

/// The set of controllers a block runs over.
///
/// Implemented for a single `&mut` controller, tuples of up to four
/// controllers and `Vec`s of controllers.
pub trait BlockParticipants {
    fn count(&self) -> usize;

    fn participant(&mut self, index: usize) -> Option<&mut dyn TransactionControl>;
}

impl<C: TransactionControl> BlockParticipants for &mut C {
    fn count(&self) -> usize {
        1
    }

    fn participant(&mut self, index: usize) -> Option<&mut dyn TransactionControl> {
        if index == 0 {
            Some(&mut **self)
        } else {
            None
        }
    }
}

impl<M: TransactionControl> BlockParticipants for Vec<M> {
    fn count(&self) -> usize {
        self.len()
    }

    fn participant(&mut self, index: usize) -> Option<&mut dyn TransactionControl> {
        self.get_mut(index).map(|member| member as &mut dyn TransactionControl)
    }
}

macro_rules! tuple_participants {
    ($count:expr; $($member:ident : $index:tt),+) => {
        impl<$($member: TransactionControl),+> BlockParticipants for ($($member,)+) {
            fn count(&self) -> usize {
                $count
            }

            fn participant(&mut self, index: usize) -> Option<&mut dyn TransactionControl> {
                match index {
                    $($index => Some(&mut self.$index),)+
                    _ => None,
                }
            }
        }
    };
}

tuple_participants!(1; A: 0);
tuple_participants!(2; A: 0, B: 1);
tuple_participants!(3; A: 0, B: 1, C: 2);
tuple_participants!(4; A: 0, B: 1, C: 2, D: 3);

/// Level a participant entered the block at, and the marker it replaced.
#[derive(Debug, Clone, Copy)]
struct BlockEntry {
    marker: usize,
    previous: Option<usize>,
}

/// Run `body` as one block-scoped transaction over `participants`.
///
/// Every participant gets a new level (named `name`, if given) before the
/// body runs. Afterwards the levels the block opened, plus anything the body
/// left open above them, are committed or aborted on all participants:
///
/// - `Ok(Continue)` commits, unless the body raised a signal it did not
///   propagate, in which case that signal decides.
/// - `Ok(CommitRequested)` or `Err(Committed)` commits.
/// - `Ok(AbortRequested)` or `Err(Aborted)` aborts.
/// - Any other error aborts and is returned unchanged.
///
/// If opening a level fails on one participant, levels already opened by
/// this block are aborted and the error is returned without running the body.
pub fn run_block<P, F>(
    mut participants: P,
    name: Option<&str>,
    body: F,
) -> TransactionResult<BlockResolution>
where
    P: BlockParticipants,
    F: FnOnce(&mut P) -> TransactionResult<BlockOutcome>,
{
    let count = participants.count();
    if count == 0 {
        return Err(TransactionError::EmptyBlock);
    }

    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let entered = match participants.participant(index) {
            Some(participant) => enter(participant, name),
            None => break,
        };
        match entered {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                // The body never ran, so the original failure is what matters.
                let _ = unwind(&mut participants, &entries, BlockResolution::Aborted);
                return Err(err);
            }
        }
    }

    let outcome = body(&mut participants);

    let mut signal = None;
    for (index, entry) in entries.iter().enumerate() {
        if let Some(participant) = participants.participant(index) {
            if let Ok(Some(raised)) = participant.take_block_signal(entry.marker) {
                signal.get_or_insert(raised);
            }
        }
    }

    let (resolution, failure) = match outcome {
        Ok(BlockOutcome::Continue) => (
            signal.map_or(BlockResolution::Committed, |s| s.resolution()),
            None,
        ),
        Ok(BlockOutcome::CommitRequested) | Err(TransactionError::Committed) => {
            (BlockResolution::Committed, None)
        }
        Ok(BlockOutcome::AbortRequested) | Err(TransactionError::Aborted) => {
            (BlockResolution::Aborted, None)
        }
        Err(err) => (BlockResolution::Aborted, Some(err)),
    };

    let closed = unwind(&mut participants, &entries, resolution);
    if let Some(err) = failure {
        return Err(err);
    }
    closed?;
    Ok(resolution)
}

/// Open the block's level on one participant and mark it.
fn enter(participant: &mut dyn TransactionControl, name: Option<&str>) -> TransactionResult<BlockEntry> {
    participant.start_transaction(name)?;

    let entered = participant.transaction_level().and_then(|marker| {
        let previous = participant.set_block_marker(Some(marker))?;
        Ok(BlockEntry { marker, previous })
    });
    if entered.is_err() {
        let _ = participant.abort_transaction(None);
    }
    entered
}

/// Close the block's levels on every entered participant, last entered first.
fn unwind<P: BlockParticipants>(
    participants: &mut P,
    entries: &[BlockEntry],
    resolution: BlockResolution,
) -> TransactionResult<()> {
    let mut first_error = None;
    for (index, entry) in entries.iter().enumerate().rev() {
        let result = match participants.participant(index) {
            Some(participant) => close(participant, entry, resolution),
            None => Ok(()),
        };
        if let Err(err) = result {
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn close(
    participant: &mut dyn TransactionControl,
    entry: &BlockEntry,
    resolution: BlockResolution,
) -> TransactionResult<()> {
    // The enclosing marker is always below ours, so closing never signals.
    participant.set_block_marker(entry.previous)?;
    while participant.transaction_level()? >= entry.marker {
        match resolution {
            BlockResolution::Aborted => participant.abort_transaction(None)?,
            BlockResolution::Committed => participant.commit_transaction(None)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::controller::Transactional;

    const VALUE: &str = "Now is the time for all good men to come to the aid of their country.";

    fn setup() -> Transactional<String> {
        Transactional::new(VALUE.to_string())
    }

    fn replace(tx: &mut Transactional<String>, from: &str, to: &str) {
        let next = tx.replace(from, to);
        **tx = next;
    }

    #[test]
    fn test_block_abort() {
        let mut value = setup();

        let resolution = value
            .transaction(None, |tv| {
                assert!(tv.is_open(None));
                replace(tv, "men", "women");
                assert_eq!(tv.as_str(), VALUE.replace("men", "women"));
                tv.abort(None)?;
                unreachable!("abort inside a block exits the block");
            })
            .unwrap();

        assert_eq!(resolution, BlockResolution::Aborted);
        assert!(!value.is_open(None));
        assert_eq!(value.as_str(), VALUE);
    }

    #[test]
    fn test_block_commit() {
        let mut value = setup();

        let resolution = value
            .transaction(None, |tv| {
                replace(tv, "men", "women");
                tv.commit(None)?;
                unreachable!("commit inside a block exits the block");
            })
            .unwrap();

        assert_eq!(resolution, BlockResolution::Committed);
        assert!(!value.is_open(None));
        assert_eq!(value.as_str(), VALUE.replace("men", "women"));
    }

    #[test]
    fn test_block_completes_normally() {
        let mut value = setup();

        let resolution = value
            .transaction(None, |tv| {
                replace(tv, "men", "women");
                tv.start(None)?;
                replace(tv, "country", "planet");
                Ok(BlockOutcome::Continue)
            })
            .unwrap();

        assert_eq!(resolution, BlockResolution::Committed);
        assert_eq!(value.level(), 0);
        assert_eq!(
            value.as_str(),
            VALUE.replace("men", "women").replace("country", "planet")
        );

        // still usable afterwards
        value.start(None).unwrap();
        value.abort(None).unwrap();
    }

    #[test]
    fn test_named_block() {
        let mut value = setup();

        value
            .transaction(Some("first"), |tv| {
                assert!(tv.is_open(Some("first")));
                replace(tv, "men", "women");
                tv.abort(Some("first"))?;
                Ok(BlockOutcome::Continue)
            })
            .unwrap();

        assert!(!value.is_open(Some("first")));
        assert_eq!(value.as_str(), VALUE);
    }

    #[test]
    fn test_named_block_error() {
        let mut value = setup();
        value.start(Some("first")).unwrap();

        value
            .transaction(Some("second"), |tv| {
                assert!(tv.is_open(Some("first")));
                assert!(tv.is_open(Some("second")));
                replace(tv, "men", "women");
                assert!(matches!(
                    tv.abort(Some("first")),
                    Err(TransactionError::CannotCrossBlockBoundary { op: Operation::Abort, .. })
                ));
                assert!(tv.commit(Some("first")).is_err());
                assert!(tv.rewind(Some("first")).is_err());
                Ok(BlockOutcome::Continue)
            })
            .unwrap();

        assert!(value.is_open(Some("first")));
        assert!(!value.is_open(Some("second")));
        assert_eq!(value.as_str(), VALUE.replace("men", "women"));

        value.abort(Some("first")).unwrap();
        assert_eq!(value.as_str(), VALUE);
    }

    #[test]
    fn test_multivar_block() {
        let mut a = setup();
        let mut b = Transactional::new(vec![1, 2, 3]);

        let resolution = run_block((&mut a, &mut b), None, |(ta, tb)| {
            assert!(ta.is_open(None));
            assert!(tb.is_open(None));
            replace(ta, "men", "women");
            tb.push(4);
            ta.abort(None)?;
            Ok(BlockOutcome::Continue)
        })
        .unwrap();

        assert_eq!(resolution, BlockResolution::Aborted);
        assert!(!a.is_open(None));
        assert!(!b.is_open(None));
        assert_eq!(a.as_str(), VALUE);
        assert_eq!(*b, vec![1, 2, 3]);

        run_block((&mut a, &mut b), None, |(_, tb)| {
            tb.push(4);
            Ok(BlockOutcome::CommitRequested)
        })
        .unwrap();
        assert_eq!(*b, vec![1, 2, 3, 4]);
        assert!(!b.is_open(None));
    }

    #[test]
    fn test_multilevel_block() {
        let mut value = setup();

        value
            .transaction(Some("outer"), |outer| {
                assert_eq!(outer.level(), 1);
                let inner = outer.transaction(Some("inner"), |inner| {
                    assert_eq!(inner.level(), 2);
                    assert!(inner.is_open(Some("inner")));
                    replace(inner, "men", "women");
                    inner.abort(None)?;
                    unreachable!("inner abort exits the inner block");
                })?;
                assert_eq!(inner, BlockResolution::Aborted);
                assert!(!outer.is_open(Some("inner")));
                assert!(outer.is_open(Some("outer")));
                assert_eq!(outer.as_str(), VALUE);

                replace(outer, "country", "planet");
                outer.commit(None)?;
                unreachable!("outer commit exits the outer block");
            })
            .unwrap();

        assert!(!value.is_open(Some("outer")));
        assert_eq!(value.as_str(), VALUE.replace("country", "planet"));
    }

    #[test]
    fn test_unrelated_error_aborts_and_propagates() {
        let mut value = setup();

        let result = value.transaction(None, |tv| {
            replace(tv, "men", "women");
            tv.rewind(Some("missing"))?;
            Ok(BlockOutcome::Continue)
        });

        assert!(matches!(
            result,
            Err(TransactionError::UnknownTransactionName { .. })
        ));
        assert!(!value.is_open(None));
        assert_eq!(value.as_str(), VALUE);
    }

    #[test]
    fn test_swallowed_signal_still_exits() {
        let mut value = setup();

        let resolution = value
            .transaction(None, |tv| {
                replace(tv, "men", "women");
                let _ = tv.abort(None);
                Ok(BlockOutcome::Continue)
            })
            .unwrap();

        assert_eq!(resolution, BlockResolution::Aborted);
        assert_eq!(value.as_str(), VALUE);
    }

    #[test]
    fn test_nested_swallowed_signals_stay_with_their_block() {
        let mut value = setup();

        let outer = value
            .transaction(Some("outer"), |outer| {
                replace(outer, "men", "women");
                let _ = outer.abort(None);

                let inner = outer.transaction(Some("inner"), |inner| {
                    inner.push_str(" +inner");
                    let _ = inner.abort(None);
                    Ok(BlockOutcome::Continue)
                })?;
                assert_eq!(inner, BlockResolution::Aborted);
                assert!(!outer.ends_with(" +inner"));
                assert!(outer.is_open(Some("outer")));
                Ok(BlockOutcome::Continue)
            })
            .unwrap();

        assert_eq!(outer, BlockResolution::Aborted);
        assert_eq!(value.level(), 0);
        assert_eq!(value.as_str(), VALUE);
    }

    #[test]
    fn test_failed_start_undoes_entered_participants() {
        let mut a = setup();
        let mut b = setup();
        b.start(Some("shared")).unwrap();

        let result = run_block((&mut a, &mut b), Some("shared"), |_| {
            unreachable!("body must not run when a start fails");
        });

        assert!(matches!(
            result,
            Err(TransactionError::DuplicateTransactionName(_))
        ));
        assert_eq!(a.level(), 0);
        assert_eq!(b.level(), 1);
    }

    #[test]
    fn test_empty_block() {
        let empty: Vec<Transactional<String>> = Vec::new();
        let result = run_block(empty, None, |_| Ok(BlockOutcome::Continue));
        assert!(matches!(result, Err(TransactionError::EmptyBlock)));
    }
}
