//! Diagnostic sink that forwards faults to the `log` facade.

use crate::domain::Fault;
use crate::ports::DiagnosticSink;

/// Prefix on every diagnostic line, so driver faults are easy to grep.
pub const DIAGNOSTIC_PREFIX: &str = "<SMC100>";

/// One `warn!` line per fault.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    pub fn format(fault: &Fault) -> String {
        format!("{DIAGNOSTIC_PREFIX} {fault}")
    }
}

impl DiagnosticSink for LogSink {
    fn report(&mut self, fault: &Fault) {
        log::warn!("{}", Self::format(fault));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_prefixed() {
        let line = LogSink::format(&Fault::CommandError { code: 'C' });
        assert_eq!(line, "<SMC100> error code: C");
    }
}
