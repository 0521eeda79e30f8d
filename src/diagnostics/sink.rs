//! Debug sink implementations.

use std::fmt;

use parking_lot::Mutex;

/// Receives one diagnostic line per transaction operation.
pub trait DebugSink: Send + Sync {
    /// Write a finished line.
    fn write_line(&self, line: &str);

    /// Whether lines should be built at all.
    fn enabled(&self) -> bool {
        true
    }
}

/// Sink that drops every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DebugSink for NoopSink {
    fn write_line(&self, _line: &str) {}

    fn enabled(&self) -> bool {
        false
    }
}

/// Sink that forwards lines to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn write_line(&self, line: &str) {
        tracing::debug!(target: "rewindable", "{}", line);
    }

    fn enabled(&self) -> bool {
        tracing::enabled!(target: "rewindable", tracing::Level::DEBUG)
    }
}

/// Sink that keeps every line in memory.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Remove and return all lines written so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl DebugSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("lines", &self.len())
            .finish()
    }
}
