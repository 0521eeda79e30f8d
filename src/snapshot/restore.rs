//! Copying a restored value back onto the live one.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{BuildHasher, Hash};

/// Field identifiers that are never rolled back.
///
/// Exclusions are consulted when a restored value is copied onto the live
/// value: excluded fields keep whatever the live value holds. Whole-value
/// types (strings, collections, scalars) have no fields and ignore the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet(BTreeSet<String>);

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. Returns false if it was already excluded.
    pub fn insert(&mut self, field: impl Into<String>) -> bool {
        self.0.insert(field.into())
    }

    pub fn remove(&mut self, field: &str) -> bool {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for ExclusionSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl fmt::Display for ExclusionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.iter().collect::<Vec<_>>().join(", "))
    }
}

/// A value that can be rewound in place.
///
/// The default `assign_from` replaces the whole value, which is right for
/// types without named fields. Structs that honor exclusions, or that keep
/// an identity the restored copy must not overwrite, implement it with
/// [`assign_fields!`](crate::assign_fields).
///
/// `after_restore` runs right after every rewind or abort. Use it to repair
/// links into the value that a deep copy cannot preserve, such as children
/// pointing back at their parent.
pub trait Transactable: Sized {
    /// Copy `restored` onto `self`, leaving excluded fields untouched.
    fn assign_from(&mut self, restored: Self, exclusions: &ExclusionSet) {
        let _ = exclusions;
        *self = restored;
    }

    /// Post-restore hook.
    fn after_restore(&mut self) {}
}

/// Assign the listed fields from a restored value, skipping exclusions.
///
/// ```
/// use rewindable::{assign_fields, ExclusionSet, Transactable};
///
/// #[derive(Clone)]
/// struct Session {
///     user: String,
///     cart: Vec<u32>,
///     hits: u64,
/// }
///
/// impl Transactable for Session {
///     fn assign_from(&mut self, restored: Self, exclusions: &ExclusionSet) {
///         assign_fields!(self, restored, exclusions, [user, cart, hits]);
///     }
/// }
/// ```
#[macro_export]
macro_rules! assign_fields {
    ($target:expr, $restored:expr, $exclusions:expr, [$($field:ident),+ $(,)?]) => {{
        let restored = $restored;
        let exclusions: &$crate::ExclusionSet = $exclusions;
        $(
            if !exclusions.contains(stringify!($field)) {
                $target.$field = restored.$field;
            }
        )+
    }};
}

macro_rules! whole_value {
    ($($ty:ty),+ $(,)?) => {
        $(impl Transactable for $ty {})+
    };
}

whole_value!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, serde_json::Value,
);

impl<T> Transactable for Vec<T> {}
impl<T> Transactable for VecDeque<T> {}
impl<T> Transactable for Option<T> {}
impl<T> Transactable for Box<T> {}
impl<T: Ord> Transactable for BTreeSet<T> {}
impl<K: Ord, V> Transactable for BTreeMap<K, V> {}
impl<T: Eq + Hash, S: BuildHasher> Transactable for HashSet<T, S> {}
impl<K: Eq + Hash, V, S: BuildHasher> Transactable for HashMap<K, V, S> {}
