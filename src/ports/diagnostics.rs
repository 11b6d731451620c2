//! Diagnostic sink port

use crate::domain::Fault;

/// Receives every protocol fault the session runs into.
pub trait DiagnosticSink: Send {
    fn report(&mut self, fault: &Fault);
}
