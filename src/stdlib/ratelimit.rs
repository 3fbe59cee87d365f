//! `ratelimit.*`: penalty boxes and rate counters.
//!
//! Real rate limiting needs state shared across requests and time;
//! this crate's `Context` is per-request (§5), so counts only persist
//! for the lifetime of one request, on `Context::ratecounters`/
//! `Context::penaltyboxes` (seeded to zero-valued registry entries by
//! `Context::from_program` for each declared name, per §5). A
//! production embedding would back this with an external counter
//! store shared across requests. An undeclared ratecounter or
//! penaltybox name is a documented no-op rather than silently
//! behaving like a declared one.

use crate::context::Context;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::EngineError;
use crate::value::Value;

pub fn dispatch(func: &str, args: &[Value], ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let v = match func {
        "open_window" => Value::Bool(true),
        "ratecounter_increment" => {
            let name = args.first().map(Value::as_string).unwrap_or_default();
            let amount = args.get(1).map(Value::as_i64).unwrap_or(1);
            match ctx.ratecounters.get_mut(&name) {
                Some(count) => {
                    *count += amount;
                    Value::Integer(*count)
                }
                None => {
                    ctx.push_diagnostic(Diagnostic::warning(
                        DiagnosticCode::UnknownIdentifier,
                        format!("ratecounter_increment: undeclared ratecounter {name}"),
                    ));
                    Value::Integer(0)
                }
            }
        }
        "check_rates" => {
            let name = args.first().map(Value::as_string).unwrap_or_default();
            let threshold = args.get(1).map(Value::as_i64).unwrap_or(i64::MAX);
            match ctx.ratecounters.get(&name) {
                Some(count) => Value::Bool(*count > threshold),
                None => {
                    ctx.push_diagnostic(Diagnostic::warning(
                        DiagnosticCode::UnknownIdentifier,
                        format!("check_rates: undeclared ratecounter {name}"),
                    ));
                    Value::Bool(false)
                }
            }
        }
        "penaltybox_add" => {
            let pb = args.first().map(Value::as_string).unwrap_or_default();
            let entry = args.get(1).map(Value::as_string).unwrap_or_default();
            match ctx.penaltyboxes.get_mut(&pb) {
                Some(entries) => {
                    entries.insert(entry);
                    Value::Bool(true)
                }
                None => {
                    ctx.push_diagnostic(Diagnostic::warning(
                        DiagnosticCode::UnknownIdentifier,
                        format!("penaltybox_add: undeclared penaltybox {pb}"),
                    ));
                    Value::Bool(false)
                }
            }
        }
        "penaltybox_has" => {
            let pb = args.first().map(Value::as_string).unwrap_or_default();
            let entry = args.get(1).map(Value::as_string).unwrap_or_default();
            Value::Bool(
                ctx.penaltyboxes
                    .get(&pb)
                    .map(|entries| entries.contains(&entry))
                    .unwrap_or(false),
            )
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_registries(ratecounters: &[&str], penaltyboxes: &[&str]) -> Context {
        let mut program = crate::ast::Program::new();
        for name in ratecounters {
            program.ratecounters.push(name.to_string());
        }
        for name in penaltyboxes {
            program.penaltyboxes.push(name.to_string());
        }
        Context::from_program(&program, crate::config::EngineConfig::default())
    }

    #[test]
    fn ratecounter_increments_persist_within_request() {
        let mut ctx = ctx_with_registries(&["rc"], &[]);
        dispatch("ratecounter_increment", &[Value::string("rc")], &mut ctx).unwrap();
        dispatch("ratecounter_increment", &[Value::string("rc")], &mut ctx).unwrap();
        let result = dispatch("check_rates", &[Value::string("rc"), Value::Integer(1)], &mut ctx)
            .unwrap()
            .unwrap();
        assert!(result.as_bool());
    }

    #[test]
    fn undeclared_ratecounter_is_a_no_op() {
        let mut ctx = ctx_with_registries(&[], &[]);
        let result = dispatch("ratecounter_increment", &[Value::string("rc")], &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(result, Value::Integer(0));
        assert_eq!(ctx.diagnostics.len(), 1);
    }

    #[test]
    fn penaltybox_add_then_has() {
        let mut ctx = ctx_with_registries(&[], &["abuse"]);
        dispatch("penaltybox_add", &[Value::string("abuse"), Value::string("1.2.3.4")], &mut ctx).unwrap();
        assert!(dispatch("penaltybox_has", &[Value::string("abuse"), Value::string("1.2.3.4")], &mut ctx)
            .unwrap()
            .unwrap()
            .as_bool());
        assert!(!dispatch("penaltybox_has", &[Value::string("abuse"), Value::string("5.6.7.8")], &mut ctx)
            .unwrap()
            .unwrap()
            .as_bool());
    }
}
