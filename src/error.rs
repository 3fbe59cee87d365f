//! Fatal, statement-boundary errors.
//!
//! These are distinct from [`crate::diagnostics::Diagnostic`]: a
//! `Diagnostic` is a soft, logged-and-continue event, while
//! `EngineError` short-circuits out of the current subroutine body via
//! `?` and is caught at the subroutine-level boundary in the compiler,
//! which converts it into the matching hard diagnostic and resolves to
//! the phase error-action.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("restart budget of {max} exceeded")]
    MaxRestartsExceeded { max: u32 },
    #[error("goto hop budget of {max} exceeded")]
    MaxGotoHopsExceeded { max: u32 },
}
