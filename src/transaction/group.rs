//! Transactions spanning several values.
//!
//! A [`Group`] forwards each operation to every member in registration
//! order, under one shared name. There is no two-phase protocol: if a member
//! rejects an operation, members before it have already applied it and
//! members after it are not touched.

use crate::transaction::controller::TransactionControl;
use crate::transaction::error::TransactionResult;
use crate::transaction::stack::CheckpointId;

/// A fixed set of controllers driven together.
///
/// ```
/// use rewindable::{Group, Transactional};
///
/// let mut x = Transactional::new(String::from("Hello, you."));
/// let mut y = Transactional::new(String::from("And you, too."));
///
/// let mut group = Group::new(vec![&mut x, &mut y]);
/// group.start(Some("first"))?;
/// assert!(group.is_open(Some("first"))?);
/// group.abort(Some("first"))?;
/// # Ok::<(), rewindable::TransactionError>(())
/// ```
#[derive(Debug)]
pub struct Group<M> {
    members: Vec<M>,
}

impl<M: TransactionControl> Group<M> {
    pub fn new(members: Vec<M>) -> Self {
        Self { members }
    }

    /// Register another member after the existing ones.
    pub fn push(&mut self, member: M) {
        self.members.push(member);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[M] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [M] {
        &mut self.members
    }

    /// Release the members.
    pub fn into_members(self) -> Vec<M> {
        self.members
    }

    /// True if every member has the transaction open.
    pub fn is_open(&self, name: Option<&str>) -> TransactionResult<bool> {
        for member in &self.members {
            if !member.transaction_open(name)? {
                return Ok(false);
            }
        }
        Ok(!self.members.is_empty())
    }

    /// Start a level on every member. Returns each member's checkpoint id.
    pub fn start(&mut self, name: Option<&str>) -> TransactionResult<Vec<CheckpointId>> {
        self.members
            .iter_mut()
            .map(|member| member.start_transaction(name))
            .collect()
    }

    pub fn rewind(&mut self, name: Option<&str>) -> TransactionResult<&mut Self> {
        for member in &mut self.members {
            member.rewind_transaction(name)?;
        }
        Ok(self)
    }

    pub fn abort(&mut self, name: Option<&str>) -> TransactionResult<&mut Self> {
        for member in &mut self.members {
            member.abort_transaction(name)?;
        }
        Ok(self)
    }

    pub fn commit(&mut self, name: Option<&str>) -> TransactionResult<&mut Self> {
        for member in &mut self.members {
            member.commit_transaction(name)?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::controller::Transactional;
    use crate::transaction::error::TransactionError;

    const VALUE1: &str = "Hello, you.";
    const VALUE2: &str = "And you, too.";

    fn replace(tx: &mut Transactional<String>, from: &str, to: &str) {
        let next = tx.replace(from, to);
        **tx = next;
    }

    #[test]
    fn test_group() {
        let mut x = Transactional::new(VALUE1.to_string());
        let mut y = Transactional::new(VALUE2.to_string());

        {
            let mut group = Group::new(vec![&mut x, &mut y]);
            group.start(Some("first")).unwrap();
            assert!(group.is_open(Some("first")).unwrap());
            assert!(group.members()[0].is_open(Some("first")));
            assert!(group.members()[1].is_open(Some("first")));

            replace(&mut group.members_mut()[0], "you", "world");
            replace(&mut group.members_mut()[1], "you", "me");

            group.start(Some("second")).unwrap();
            replace(&mut group.members_mut()[0], "world", "HAL");
            replace(&mut group.members_mut()[1], "me", "Dave");

            group.rewind(Some("second")).unwrap();
            assert_eq!(group.members()[0].as_str(), "Hello, world.");
            assert_eq!(group.members()[1].as_str(), "And me, too.");

            replace(&mut group.members_mut()[0], "world", "HAL");
            replace(&mut group.members_mut()[1], "me", "Dave");

            group.commit(Some("second")).unwrap();
            assert_eq!(group.members()[0].as_str(), "Hello, HAL.");
            assert_eq!(group.members()[1].as_str(), "And Dave, too.");

            group.abort(Some("first")).unwrap();
        }

        assert_eq!(x.as_str(), VALUE1);
        assert_eq!(y.as_str(), VALUE2);
        assert!(!x.is_open(None));
    }

    #[test]
    fn test_group_partial_failure() {
        let mut x = Transactional::new(VALUE1.to_string());
        let mut y = Transactional::new(VALUE2.to_string());
        y.start(Some("first")).unwrap();

        let mut group = Group::new(vec![&mut x, &mut y]);
        let result = group.start(Some("first"));
        assert!(matches!(
            result,
            Err(TransactionError::DuplicateTransactionName(_))
        ));

        // the first member already applied the start
        assert!(group.is_open(Some("first")).unwrap());
        let members = group.into_members();
        assert_eq!(members[0].level(), 1);
        assert_eq!(members[1].level(), 1);
    }

    #[test]
    fn test_empty_group_is_not_open() {
        let group: Group<Transactional<String>> = Group::new(Vec::new());
        assert!(group.is_empty());
        assert!(!group.is_open(None).unwrap());
    }
}
