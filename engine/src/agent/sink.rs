//! Token sinks: observers of the model's streamed output

use std::io::Write;

/// Receives text fragments as they stream in from the model
pub trait TokenSink: Send + Sync {
    /// Called once per fragment, in arrival order
    fn on_token(&self, token: &str);

    /// Called once after the last fragment of a response
    fn on_end(&self);
}

/// Writes fragments to stdout as they arrive
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl TokenSink for StdoutSink {
    fn on_token(&self, token: &str) {
        let mut stdout = std::io::stdout().lock();
        // A closed stdout must not abort the task.
        let _ = stdout.write_all(token.as_bytes());
        let _ = stdout.flush();
    }

    fn on_end(&self) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(b"\n");
        let _ = stdout.flush();
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TokenSink for NoopSink {
    fn on_token(&self, _token: &str) {}

    fn on_end(&self) {}
}
