//! Snapshot codecs: how a value's full state is captured and rebuilt.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::snapshot::error::{SnapshotError, SnapshotResult};

/// Captures and restores the complete state of a `T`.
///
/// `capture` must produce a copy that is independent of the live value:
/// later edits to the value never show up in the checkpoint. `restore`
/// builds a brand new value from a checkpoint; the controller then copies
/// that value onto the live one, so the live value keeps its identity.
pub trait Snapshotter<T> {
    /// Opaque captured state.
    type Checkpoint;

    /// Take an independent deep copy of `value`.
    fn capture(&self, value: &T) -> SnapshotResult<Self::Checkpoint>;

    /// Rebuild a fresh value from a checkpoint.
    fn restore(&self, checkpoint: &Self::Checkpoint) -> SnapshotResult<T>;
}

/// Snapshotter backed by `Clone`.
///
/// The checkpoint is a clone of the value, so `Clone` has to be a deep copy.
/// Types holding `Rc`/`Arc` to mutable state will share that state with
/// their checkpoints; use [`JsonSnapshotter`] or a hand-written `Clone` for
/// those.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneSnapshotter;

impl<T: Clone> Snapshotter<T> for CloneSnapshotter {
    type Checkpoint = T;

    fn capture(&self, value: &T) -> SnapshotResult<T> {
        Ok(value.clone())
    }

    fn restore(&self, checkpoint: &T) -> SnapshotResult<T> {
        Ok(checkpoint.clone())
    }
}

/// Snapshotter that round-trips the value through JSON.
///
/// Always a deep copy. Shared sub-values are duplicated on restore.
/// `capture` decodes what it just encoded, so a value JSON cannot carry
/// faithfully (a `NaN` float, say) is rejected when the level opens rather
/// than when it is rolled back.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSnapshotter;

/// Encoded JSON state held by a [`JsonSnapshotter`] checkpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct JsonCheckpoint(Box<[u8]>);

impl JsonCheckpoint {
    /// Size of the encoded state in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for JsonCheckpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(text) => f.debug_tuple("JsonCheckpoint").field(&text).finish(),
            Err(_) => f.debug_tuple("JsonCheckpoint").field(&self.0.len()).finish(),
        }
    }
}

impl<T> Snapshotter<T> for JsonSnapshotter
where
    T: Serialize + DeserializeOwned,
{
    type Checkpoint = JsonCheckpoint;

    fn capture(&self, value: &T) -> SnapshotResult<JsonCheckpoint> {
        let bytes = serde_json::to_vec(value).map_err(SnapshotError::Encode)?;
        // Non-finite floats encode as null and would never decode again.
        serde_json::from_slice::<T>(&bytes).map_err(SnapshotError::Encode)?;
        Ok(JsonCheckpoint(bytes.into_boxed_slice()))
    }

    fn restore(&self, checkpoint: &JsonCheckpoint) -> SnapshotResult<T> {
        serde_json::from_slice(&checkpoint.0).map_err(SnapshotError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        owner: String,
        balance: i64,
        tags: BTreeMap<String, String>,
    }

    fn account() -> Account {
        let mut tags = BTreeMap::new();
        tags.insert("tier".to_string(), "gold".to_string());
        Account {
            owner: "Alice".to_string(),
            balance: 100,
            tags,
        }
    }

    #[test]
    fn test_clone_capture_is_independent() {
        let mut value = account();
        let checkpoint = CloneSnapshotter.capture(&value).unwrap();

        value.balance = 0;
        value.tags.clear();

        let restored: Account = CloneSnapshotter.restore(&checkpoint).unwrap();
        assert_eq!(restored, account());
    }

    #[test]
    fn test_json_capture_is_independent() {
        let mut value = account();
        let checkpoint = JsonSnapshotter.capture(&value).unwrap();
        assert!(!checkpoint.is_empty());

        value.owner.push_str(" Smith");

        let restored: Account = JsonSnapshotter.restore(&checkpoint).unwrap();
        assert_eq!(restored, account());
    }

    #[test]
    fn test_json_restore_wrong_type_fails() {
        let value = "just a string".to_string();
        let checkpoint = JsonSnapshotter.capture(&value).unwrap();
        let result: SnapshotResult<Account> = JsonSnapshotter.restore(&checkpoint);
        assert!(matches!(result, Err(SnapshotError::Decode(_))));
    }

    #[test]
    fn test_json_capture_unrepresentable_fails() {
        // JSON object keys must be strings
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1u8);
        let result = Snapshotter::<BTreeMap<Vec<u8>, u8>>::capture(&JsonSnapshotter, &map);
        assert!(matches!(result, Err(SnapshotError::Encode(_))));
    }

    #[test]
    fn test_json_capture_non_finite_float_fails() {
        let value = vec![1.0, f64::NAN];
        let result = Snapshotter::<Vec<f64>>::capture(&JsonSnapshotter, &value);
        assert!(matches!(result, Err(SnapshotError::Encode(_))));

        let finite = vec![1.0, 2.5];
        let checkpoint = JsonSnapshotter.capture(&finite).unwrap();
        let restored: Vec<f64> = JsonSnapshotter.restore(&checkpoint).unwrap();
        assert_eq!(restored, finite);
    }
}
