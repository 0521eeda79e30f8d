//! Fail-fast thread-safe controller wrapper.
//!
//! [`ThreadSafe`] guards a controller with a per-object lock that is never
//! waited on: if another thread is inside a call on the same object, the
//! call fails with [`TransactionError::LockUnavailable`] right away. The lock
//! covers one controller call at a time; it does not make a caller's edits
//! between calls atomic.

use std::fmt;

use parking_lot::{Mutex, MutexGuard};

use crate::transaction::block::BlockSignal;
use crate::transaction::controller::TransactionControl;
use crate::transaction::error::{TransactionError, TransactionResult};
use crate::transaction::operation::Operation;
use crate::transaction::stack::CheckpointId;

/// A controller shared between threads behind a non-blocking lock.
///
/// Share it with `Arc<ThreadSafe<_>>`. `&ThreadSafe<_>` implements
/// [`TransactionControl`], so shared wrappers can join groups and blocks.
pub struct ThreadSafe<C> {
    inner: Mutex<C>,
}

impl<C: TransactionControl> ThreadSafe<C> {
    pub fn new(controller: C) -> Self {
        Self {
            inner: Mutex::new(controller),
        }
    }

    pub fn into_inner(self) -> C {
        self.inner.into_inner()
    }

    /// Check if some call currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Run `f` with exclusive access to the controller and its value.
    ///
    /// Controller calls made through this wrapper from inside `f` fail with
    /// `LockUnavailable`; use the `&mut C` handed to `f` instead.
    pub fn try_with<R>(&self, f: impl FnOnce(&mut C) -> R) -> TransactionResult<R> {
        let mut guard = self.acquire(Operation::Access)?;
        Ok(f(&mut guard))
    }

    pub fn level(&self) -> TransactionResult<usize> {
        self.acquire(Operation::Open)?.transaction_level()
    }

    pub fn is_open(&self, name: Option<&str>) -> TransactionResult<bool> {
        self.acquire(Operation::Open)?.transaction_open(name)
    }

    pub fn name(&self) -> TransactionResult<Option<String>> {
        self.acquire(Operation::Name)?.transaction_name()
    }

    pub fn start(&self, name: Option<&str>) -> TransactionResult<CheckpointId> {
        self.acquire(Operation::Start)?.start_transaction(name)
    }

    pub fn rewind(&self, name: Option<&str>) -> TransactionResult<&Self> {
        self.acquire(Operation::Rewind)?.rewind_transaction(name)?;
        Ok(self)
    }

    pub fn abort(&self, name: Option<&str>) -> TransactionResult<&Self> {
        self.acquire(Operation::Abort)?.abort_transaction(name)?;
        Ok(self)
    }

    pub fn commit(&self, name: Option<&str>) -> TransactionResult<&Self> {
        self.acquire(Operation::Commit)?.commit_transaction(name)?;
        Ok(self)
    }

    /// Take the lock or fail immediately. The guard releases it on drop,
    /// including when the guarded call returns an error.
    fn acquire(&self, op: Operation) -> TransactionResult<MutexGuard<'_, C>> {
        self.inner
            .try_lock()
            .ok_or(TransactionError::LockUnavailable { op })
    }
}

impl<C: TransactionControl> TransactionControl for &ThreadSafe<C> {
    fn transaction_level(&self) -> TransactionResult<usize> {
        (**self).level()
    }

    fn transaction_open(&self, name: Option<&str>) -> TransactionResult<bool> {
        (**self).is_open(name)
    }

    fn transaction_name(&self) -> TransactionResult<Option<String>> {
        (**self).name()
    }

    fn start_transaction(&mut self, name: Option<&str>) -> TransactionResult<CheckpointId> {
        (**self).start(name)
    }

    fn rewind_transaction(&mut self, name: Option<&str>) -> TransactionResult<()> {
        (**self).rewind(name).map(|_| ())
    }

    fn abort_transaction(&mut self, name: Option<&str>) -> TransactionResult<()> {
        (**self).abort(name).map(|_| ())
    }

    fn commit_transaction(&mut self, name: Option<&str>) -> TransactionResult<()> {
        (**self).commit(name).map(|_| ())
    }

    fn set_block_marker(&mut self, marker: Option<usize>) -> TransactionResult<Option<usize>> {
        self.acquire(Operation::Access)?.set_block_marker(marker)
    }

    fn take_block_signal(&mut self, marker: usize) -> TransactionResult<Option<BlockSignal>> {
        self.acquire(Operation::Access)?.take_block_signal(marker)
    }
}

impl<C> fmt::Debug for ThreadSafe<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadSafe")
            .field("locked", &self.inner.is_locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    use crate::transaction::block::{run_block, BlockOutcome, BlockResolution};
    use crate::transaction::controller::Transactional;
    use crate::transaction::group::Group;

    const VALUE: &str = "Now is the time for all good men to come to the aid of their country.";

    fn setup() -> ThreadSafe<Transactional<String>> {
        ThreadSafe::new(Transactional::new(VALUE.to_string()))
    }

    fn replace(safe: &ThreadSafe<Transactional<String>>, from: &str, to: &str) {
        safe.try_with(|tx| {
            let next = tx.replace(from, to);
            **tx = next;
        })
        .unwrap();
    }

    fn read(safe: &ThreadSafe<Transactional<String>>) -> String {
        safe.try_with(|tx| tx.value().clone()).unwrap()
    }

    #[test]
    fn test_abort() {
        let safe = setup();
        assert!(safe.abort(None).is_err());
        safe.start(None).unwrap();
        assert!(safe.is_open(None).unwrap());
        replace(&safe, "men", "women");
        safe.abort(None).unwrap();
        assert!(!safe.is_open(None).unwrap());
        assert_eq!(read(&safe), VALUE);
    }

    #[test]
    fn test_multilevel_named() {
        let safe = setup();
        assert!(safe.name().is_err());
        safe.start(Some("first")).unwrap();
        assert!(safe.start(Some("first")).is_err());
        assert_eq!(safe.name().unwrap().as_deref(), Some("first"));

        replace(&safe, "men", "women");
        safe.start(Some("second")).unwrap();
        replace(&safe, "women", "people");
        safe.rewind(Some("first")).unwrap();

        assert_eq!(read(&safe), VALUE);
        assert_eq!(safe.level().unwrap(), 1);
        safe.commit(None).unwrap();
        assert!(!safe.is_locked());
    }

    #[test]
    fn test_lock_released_after_error() {
        let safe = setup();
        assert!(matches!(
            safe.commit(Some("missing")),
            Err(TransactionError::NoOpenTransaction { .. })
        ));
        assert!(!safe.is_locked());
        safe.start(None).unwrap();
    }

    #[test]
    fn test_reentrant_call_fails_fast() {
        let safe = setup();
        let nested = safe.try_with(|_| safe.start(None)).unwrap();
        assert!(matches!(
            nested,
            Err(TransactionError::LockUnavailable { op: Operation::Start })
        ));
        assert_eq!(safe.level().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_call_fails_fast() {
        let safe = Arc::new(setup());
        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let safe = Arc::clone(&safe);
            thread::spawn(move || {
                safe.try_with(|tx| {
                    tx.start(None).unwrap();
                    locked_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
                .unwrap();
            })
        };

        locked_rx.recv().unwrap();
        let err = safe.start(None).unwrap_err();
        assert!(matches!(err, TransactionError::LockUnavailable { .. }));
        assert!(err.is_retryable());
        assert!(matches!(
            safe.is_open(None),
            Err(TransactionError::LockUnavailable { op: Operation::Open })
        ));

        release_tx.send(()).unwrap();
        holder.join().unwrap();

        assert_eq!(safe.level().unwrap(), 1);
    }

    #[test]
    fn test_threadsafe_group() {
        let x = ThreadSafe::new(Transactional::new("Hello, you.".to_string()));
        let y = ThreadSafe::new(Transactional::new("And you, too.".to_string()));

        let mut group = Group::new(vec![&x, &y]);
        group.start(Some("first")).unwrap();
        replace(&x, "you", "world");
        replace(&y, "you", "me");
        group.abort(Some("first")).unwrap();

        assert_eq!(read(&x), "Hello, you.");
        assert_eq!(read(&y), "And you, too.");
    }

    #[test]
    fn test_threadsafe_block() {
        let safe = setup();

        let resolution = run_block(&mut &safe, None, |tv| {
            replace(tv, "men", "women");
            tv.abort(None)?;
            Ok(BlockOutcome::Continue)
        })
        .unwrap();

        assert_eq!(resolution, BlockResolution::Aborted);
        assert_eq!(read(&safe), VALUE);
        assert!(!safe.is_open(None).unwrap());
    }
}
