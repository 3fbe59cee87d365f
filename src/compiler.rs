//! The subroutine compiler: binds `Program` subroutines into
//! executable closures over a shared `Context`, resolves labels, and
//! applies the default/error control-flow actions per phase (§4.1).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{Param, Program, Statement};
use crate::context::Context;
use crate::diagnostics::Diagnostic;
use crate::exec::{exec_statement, Flow};

#[derive(Debug, Clone)]
pub struct CompiledSubroutine {
    pub name: String,
    pub body: Vec<Statement>,
    pub labels: HashMap<String, usize>,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
}

pub type SubroutineMap = HashMap<String, CompiledSubroutine>;

/// Default action returned when a subroutine body completes without
/// an explicit `return` (§4.1).
pub fn phase_default(name: &str) -> &'static str {
    match name {
        "vcl_recv" => "lookup",
        "vcl_hash" => "hash",
        "vcl_hit" => "fetch",
        "vcl_miss" => "fetch",
        "vcl_pass" => "fetch",
        "vcl_fetch" => "deliver",
        "vcl_deliver" => "deliver",
        "vcl_error" => "deliver",
        "vcl_pipe" => "pipe",
        "vcl_init" => "ok",
        "vcl_synth" => "deliver",
        _ => "ok",
    }
}

/// Action substituted when an uncaught evaluation error propagates to
/// the subroutine boundary: identical to the phase default except the
/// request-path phases all resolve to `"error"` (§4.1).
pub fn phase_error_action(name: &str) -> &'static str {
    match name {
        "vcl_recv" | "vcl_hash" | "vcl_hit" | "vcl_miss" | "vcl_pass" | "vcl_fetch" => "error",
        other => phase_default(other),
    }
}

fn label_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*):\s*$").unwrap())
}

/// Resolve label → statement-index for one subroutine body.
///
/// Per §4.1 the authoritative scan is twofold: first over the raw
/// source text (to catch labels a text-based parser left as bare
/// lines rather than `LabelStatement` nodes), then over the
/// already-built statement list, with the statement scan winning on
/// conflict. Since this crate's AST is always constructed directly via
/// builders (never by parsing VCL text — see §6.1), every label is
/// already an explicit `Statement::Label` node; the text scan
/// therefore degrades to a confirmation pass that only ever produces a
/// diagnostic (a label mentioned in `source_text` but absent from the
/// body, which would indicate a builder bug upstream of this crate).
pub fn resolve_labels(sub_name: &str, body: &[Statement], source_text: Option<&str>) -> HashMap<String, usize> {
    let mut labels = HashMap::new();

    if let Some(text) = source_text {
        for captures in label_line_pattern().captures_iter(text) {
            let name = captures[1].to_string();
            if !body.iter().any(|s| matches!(s, Statement::Label { name: n, .. } if n == &name)) {
                tracing::warn!(
                    sub = sub_name,
                    label = name.as_str(),
                    "label present in source text but not emitted as a Statement::Label"
                );
            }
        }
    }

    for (index, statement) in body.iter().enumerate() {
        if let Statement::Label { name, .. } = statement {
            labels.insert(name.clone(), index);
        }
    }

    labels
}

/// Compile a `Program`'s ACL/Backend/Director/Table/Penaltybox/
/// Ratecounter declarations and subroutines into a name → compiled
/// form map. Registry seeding itself happens per-request in
/// `Context::from_program`; this function only prepares the
/// subroutine closures and their label maps.
pub fn compile(program: &Program) -> SubroutineMap {
    let mut map = HashMap::new();
    for sub in &program.subroutines {
        let labels = resolve_labels(&sub.name, &sub.body, sub.source_text.as_deref());
        map.insert(
            sub.name.clone(),
            CompiledSubroutine {
                name: sub.name.clone(),
                body: sub.body.clone(),
                labels,
                params: sub.params.clone(),
                return_type: sub.return_type.clone(),
            },
        );
    }
    map
}

/// Run one compiled subroutine to completion against `ctx`, returning
/// the phase action. Uncaught evaluation errors are recovered here:
/// logged as a hard diagnostic and translated to the phase error
/// action, never propagated to the caller (§7).
pub fn run_subroutine(
    sub: &CompiledSubroutine,
    ctx: &mut Context,
    subroutines: &SubroutineMap,
) -> String {
    let mut index = 0usize;
    let mut goto_hops = 0u32;
    while index < sub.body.len() {
        match exec_statement(&sub.body[index], ctx, subroutines) {
            Ok(Flow::Continue) => index += 1,
            Ok(Flow::Return(action)) => return action,
            Ok(Flow::Goto(label)) => {
                if let Some(max) = ctx.config.max_goto_hops {
                    goto_hops += 1;
                    if goto_hops > max {
                        ctx.push_diagnostic(
                            Diagnostic::max_goto_hops_exceeded(max)
                                .with_sub(&sub.name)
                                .with_statement_index(index),
                        );
                        return phase_error_action(&sub.name).to_string();
                    }
                }
                match sub.labels.get(&label) {
                    Some(&target) => index = target,
                    None => {
                        ctx.push_diagnostic(
                            Diagnostic::warning(
                                crate::diagnostics::DiagnosticCode::UnboundedGoto,
                                format!("goto to undefined label {label}"),
                            )
                            .with_sub(&sub.name)
                            .with_statement_index(index),
                        );
                        index += 1;
                    }
                }
            }
            Err(engine_error) => {
                ctx.push_diagnostic(
                    match &engine_error {
                        crate::error::EngineError::DivisionByZero => {
                            Diagnostic::division_by_zero("division")
                        }
                        crate::error::EngineError::ModuloByZero => {
                            Diagnostic::division_by_zero("modulo")
                        }
                        crate::error::EngineError::MaxRestartsExceeded { max } => {
                            Diagnostic::max_restarts_exceeded(*max)
                        }
                        crate::error::EngineError::MaxGotoHopsExceeded { max } => {
                            Diagnostic::max_goto_hops_exceeded(*max)
                        }
                    }
                    .with_sub(&sub.name)
                    .with_statement_index(index),
                );
                return phase_error_action(&sub.name).to_string();
            }
        }
    }
    phase_default(&sub.name).to_string()
}
