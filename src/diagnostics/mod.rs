//! Operation tracing for transactional values.
//!
//! Every controller operation can emit one line to a [`DebugSink`]. Lines
//! are prefixed with the operation's marker repeated once per open level,
//! so nested transactions read as an indented log:
//!
//! ```text
//! > Start Transaction(Some("outer"))
//! >> Start Transaction(None)
//! << Commit Transaction(None)
//! < Abort Transaction(Some("outer"))
//! ```
//!
//! The default sink discards everything.

mod sink;

pub use sink::{DebugSink, MemorySink, NoopSink, TracingSink};
