//! User-facing progress stream
//!
//! Verification emits one human-readable line per checked object plus a
//! summary, on a channel independent of the returned error: the verdict
//! boundary strips error detail, so these lines are where diagnosis happens.
//! The engine takes the sink at construction; there is no global progress
//! state.

use tracing::info;

/// Sink for human-readable progress and failure lines
pub trait ProgressSink: Send + Sync {
    /// Emit one progress line
    fn emit(&self, line: &str);
}

/// Prints progress to stdout and mirrors it to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn emit(&self, line: &str) {
        println!("{}", line);
        info!("{}", line);
    }
}

/// Records lines in memory; used by tests to assert on the stream
#[derive(Debug, Default)]
pub struct RecordingProgress {
    lines: std::sync::Mutex<Vec<String>>,
}

impl RecordingProgress {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far, in order
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("progress lock poisoned").clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .expect("progress lock poisoned")
            .push(line.to_string());
    }
}
