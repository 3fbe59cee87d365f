//! `vcl-engine`: an AST-consuming compiler and tree-walking evaluator
//! for VCL subroutines. Parsing VCL source text into the AST defined
//! here is out of scope; callers construct `ast::Program` values
//! directly (see `ast` module docs) and hand them to `compiler::compile`.

pub mod acl;
pub mod ast;
pub mod compiler;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod eval;
pub mod exec;
pub mod header_map;
pub mod ip;
pub mod stdlib;
pub mod value;

pub use ast::Program;
pub use compiler::{compile, run_subroutine, SubroutineMap};
pub use context::Context;
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use driver::{execute, run_to_completion};
pub use error::EngineError;
pub use value::Value;
