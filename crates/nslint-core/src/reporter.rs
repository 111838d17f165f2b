//! Diagnostic sinks.

use crate::types::{Diagnostic, Report, Severity};

/// Receives diagnostics as they are emitted.
///
/// The verifier never prints or logs findings itself; hosts decide what to
/// do with them by picking a reporter.
pub trait Reporter {
    /// Accepts one diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

impl Reporter for Report {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

impl Reporter for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Forwards diagnostics to `tracing` and keeps a running count.
#[derive(Debug, Default)]
pub struct TracingReporter {
    errors: usize,
    warnings: usize,
    traces: usize,
}

impl TracingReporter {
    /// Creates a new reporter with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of error diagnostics forwarded so far.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Number of warning diagnostics forwarded so far.
    #[must_use]
    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// Number of trace diagnostics forwarded so far.
    #[must_use]
    pub fn traces(&self) -> usize {
        self.traces
    }
}

impl Reporter for TracingReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        let code = diagnostic.code();
        let message = diagnostic.message();
        match diagnostic.severity() {
            Severity::Error => {
                self.errors += 1;
                tracing::error!(code, "{message}");
            }
            Severity::Warning => {
                self.warnings += 1;
                tracing::warn!(code, "{message}");
            }
            Severity::Trace => {
                self.traces += 1;
                tracing::trace!(code, "{message}");
            }
        }
    }
}
