//! The diagnostic sink: emits formatted diagnostics to the output stream
//! and latches the interpreter's "crashed" state on the first error.

use std::io::Write;

use gbd_opcodes::diagnostics::{Diagnostic, Kind, Severity};

/// Accumulates diagnostics and tracks whether a fatal one has occurred.
/// Diagnostics are not buffered for later printing — they're printed as
/// they're emitted, interleaved with the command trace — but the sink
/// still counts them for the post-mortem summary.
#[derive(Default)]
pub struct Diagnostics {
    crashed: bool,
    warning_count: u32,
    error_count: u32,
    expansion_of: Option<&'static str>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn crashed(&self) -> bool {
        self.crashed
    }

    #[must_use]
    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Mark subsequent emissions, until cleared, as occurring inside the
    /// expansion of a compound macro, so they're prefixed with a
    /// `Note: In expansion of macro '...':` line.
    pub fn enter_expansion(&mut self, macro_name: &'static str) {
        self.expansion_of = Some(macro_name);
    }

    pub fn leave_expansion(&mut self) {
        self.expansion_of = None;
    }

    /// Emit a diagnostic: format it, print it with its severity color
    /// prefix, and latch `crashed` if it's fatal.
    pub fn emit(&mut self, out: &mut dyn Write, kind: Kind, message: String) {
        let mut diag = Diagnostic::new(kind, message);
        if let Some(name) = self.expansion_of {
            diag = diag.in_expansion_of(name);
        }
        match diag.severity() {
            Severity::Warning => self.warning_count += 1,
            Severity::Error => {
                self.error_count += 1;
                self.crashed = true;
            }
        }
        let _ = writeln!(out, "{diag}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbd_opcodes::diagnostics::Kind;

    #[test]
    fn error_emission_latches_crashed() {
        let mut diags = Diagnostics::new();
        let mut out = Vec::new();
        diags.emit(&mut out, Kind::DlStackOverflow, "overflow".into());
        assert!(diags.crashed());
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn warning_emission_does_not_latch_crashed() {
        let mut diags = Diagnostics::new();
        let mut out = Vec::new();
        diags.emit(&mut out, Kind::UnsetSegment, "segment 3 unset".into());
        assert!(!diags.crashed());
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn expansion_note_is_printed_once_entered() {
        let mut diags = Diagnostics::new();
        let mut out = Vec::new();
        diags.enter_expansion("SP1Triangle");
        diags.emit(&mut out, Kind::TriVtxOob, "vertex 9 out of range".into());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("In expansion of macro 'SP1Triangle'"));
    }
}
