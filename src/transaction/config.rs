//! Controller configuration.

use std::fmt;
use std::sync::Arc;

use crate::diagnostics::{DebugSink, NoopSink, TracingSink};

/// Configuration injected into a controller at construction.
#[derive(Clone)]
pub struct TransactionConfig {
    /// Where diagnostic lines go.
    pub sink: Arc<dyn DebugSink>,
    /// Also log the checkpoint id and capture time after start, rewind and abort.
    pub trace_checkpoints: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            sink: Arc::new(NoopSink),
            trace_checkpoints: false,
        }
    }
}

impl TransactionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that logs through `tracing`.
    pub fn tracing() -> Self {
        Self::default().sink(Arc::new(TracingSink))
    }

    /// Set the diagnostic sink.
    pub fn sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set trace_checkpoints flag.
    pub fn trace_checkpoints(mut self, value: bool) -> Self {
        self.trace_checkpoints = value;
        self
    }
}

impl fmt::Debug for TransactionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionConfig")
            .field("sink_enabled", &self.sink.enabled())
            .field("trace_checkpoints", &self.trace_checkpoints)
            .finish()
    }
}
