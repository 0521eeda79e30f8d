//! Transaction operations.
//!
//! Used to label errors and diagnostic lines.

use std::fmt;

/// A controller operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Query whether a level is open.
    Open,
    /// Read the name of the top level.
    Name,
    /// Open a new level.
    Start,
    /// Restore a level without closing it.
    Rewind,
    /// Restore and close levels.
    Abort,
    /// Close levels, keeping their edits.
    Commit,
    /// Read or replace the wrapped value.
    Access,
}

impl Operation {
    /// Label used in diagnostic lines.
    pub fn description(&self) -> &'static str {
        match self {
            Operation::Open => "Transaction",
            Operation::Name => "Transaction Name",
            Operation::Start => "Start Transaction",
            Operation::Rewind => "Rewind Transaction",
            Operation::Abort => "Abort Transaction",
            Operation::Commit => "Commit Transaction",
            Operation::Access => "Access",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Open => write!(f, "check"),
            Operation::Name => write!(f, "name"),
            Operation::Start => write!(f, "start"),
            Operation::Rewind => write!(f, "rewind"),
            Operation::Abort => write!(f, "abort"),
            Operation::Commit => write!(f, "commit"),
            Operation::Access => write!(f, "access"),
        }
    }
}
