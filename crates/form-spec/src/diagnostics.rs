use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{error, warn};

/// Entry written when a submit cycle fails after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The remote endpoint answered with a non-success status.
    RemoteRejection { status: u16, body: Value },
    /// Transport, decode or schema failure.
    SubmitFailure { message: String },
}

/// Sink for failures that are never surfaced to the user.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

/// Writes diagnostics as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::RemoteRejection { status, body } => {
                warn!(status, body = %body, "remote endpoint rejected submission");
            }
            Diagnostic::SubmitFailure { message } => {
                error!(error = %message, "form submission failed");
            }
        }
    }
}

/// Keeps diagnostics in memory; handy for hosts that display a log pane.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, diagnostic: Diagnostic) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(diagnostic);
        }
    }
}
