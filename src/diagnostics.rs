//! Structured diagnostics for recoverable interpreter events.
//!
//! Mirrors the shape of the binding/validation diagnostics used
//! elsewhere in this codebase: a severity-tagged, constructor-built
//! value that is both returned to callers and emitted through
//! `tracing`.

use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    InvalidRegex,
    DivisionByZero,
    MaxRestartsExceeded,
    MaxGotoHopsExceeded,
    UnknownFunction,
    UnknownIdentifier,
    InvalidTimeValue,
    InvalidCidr,
    UnboundedGoto,
    InvalidArgument,
}

impl DiagnosticCode {
    /// Errors that must terminate the current subroutine body and
    /// resolve to the phase error-action, per §7.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DiagnosticCode::DivisionByZero
                | DiagnosticCode::MaxRestartsExceeded
                | DiagnosticCode::MaxGotoHopsExceeded
        )
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub sub_name: Option<String>,
    pub statement_index: Option<usize>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            sub_name: None,
            statement_index: None,
        }
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn with_sub(mut self, sub_name: impl Into<String>) -> Self {
        self.sub_name = Some(sub_name.into());
        self
    }

    pub fn with_statement_index(mut self, index: usize) -> Self {
        self.statement_index = Some(index);
        self
    }

    pub fn is_hard_error(&self) -> bool {
        self.severity == Severity::Error && self.code.is_fatal()
    }

    /// Emit this diagnostic on the tracing stream at the severity it
    /// carries. Call sites still push the value onto `Context::diagnostics`
    /// so tests can assert on it without capturing log output.
    pub fn emit(&self) {
        match self.severity {
            Severity::Error => error!(
                code = ?self.code,
                sub = self.sub_name.as_deref().unwrap_or("-"),
                "{}",
                self.message
            ),
            Severity::Warning => warn!(
                code = ?self.code,
                sub = self.sub_name.as_deref().unwrap_or("-"),
                "{}",
                self.message
            ),
            Severity::Info => tracing::info!(
                code = ?self.code,
                sub = self.sub_name.as_deref().unwrap_or("-"),
                "{}",
                self.message
            ),
        }
    }

    pub fn invalid_regex(pattern: &str) -> Self {
        Self::warning(
            DiagnosticCode::InvalidRegex,
            format!("invalid regex pattern: {pattern}"),
        )
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::warning(
            DiagnosticCode::UnknownFunction,
            format!("unknown function: {name}"),
        )
    }

    pub fn max_restarts_exceeded(max: u32) -> Self {
        Self::error(
            DiagnosticCode::MaxRestartsExceeded,
            format!("restart budget exceeded (max {max})"),
        )
    }

    pub fn max_goto_hops_exceeded(max: u32) -> Self {
        Self::error(
            DiagnosticCode::MaxGotoHopsExceeded,
            format!("goto hop budget exceeded (max {max})"),
        )
    }

    pub fn division_by_zero(op: &str) -> Self {
        Self::error(
            DiagnosticCode::DivisionByZero,
            format!("{op} by zero"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_error_classification() {
        let d = Diagnostic::max_restarts_exceeded(4);
        assert!(d.is_hard_error());

        let d = Diagnostic::invalid_regex("(");
        assert!(!d.is_hard_error());
    }

    #[test]
    fn builders_attach_context() {
        let d = Diagnostic::unknown_function("foo.bar").with_sub("vcl_recv").with_statement_index(3);
        assert_eq!(d.sub_name.as_deref(), Some("vcl_recv"));
        assert_eq!(d.statement_index, Some(3));
    }
}
