//! The statement executor: `if`/`set`/`unset`/`add`/`declare`/`log`/
//! `synthetic`/`hash_data`/`error`/`restart`/`goto`/`label`/`call`/
//! `switch`/`esi`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::ast::{CompoundOp, Expression, Statement, SwitchCase};
use crate::compiler::{run_subroutine, SubroutineMap};
use crate::context::Context;
use crate::diagnostics::Diagnostic;
use crate::error::EngineError;
use crate::eval::evaluate;
use crate::value::{parse_time_value_seconds, Value};

/// The outcome of executing one statement (or a block of them):
/// fall through to the next statement, return a phase action, or jump
/// to a label. `Goto` is the only user-observable-free sentinel — it
/// never escapes the compiled closure (§9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Return(String),
    Goto(String),
}

const CANONICAL_ACTIONS: &[&str] = &[
    "deliver",
    "pass",
    "lookup",
    "fetch",
    "error",
    "restart",
    "pipe",
    "hash",
    "deliver_stale",
    "hit_for_pass",
    "ok",
];

pub fn is_canonical_action(action: &str) -> bool {
    CANONICAL_ACTIONS.contains(&action)
}

pub fn exec_block(
    body: &[Statement],
    ctx: &mut Context,
    subroutines: &SubroutineMap,
) -> Result<Flow, EngineError> {
    for statement in body {
        let flow = exec_statement(statement, ctx, subroutines)?;
        if flow != Flow::Continue {
            return Ok(flow);
        }
    }
    Ok(Flow::Continue)
}

pub fn exec_statement(
    statement: &Statement,
    ctx: &mut Context,
    subroutines: &SubroutineMap,
) -> Result<Flow, EngineError> {
    match statement {
        Statement::If {
            test,
            consequent,
            alternate,
        } => {
            if evaluate(test, ctx)?.is_truthy() {
                exec_block(consequent, ctx, subroutines)
            } else {
                exec_block(alternate, ctx, subroutines)
            }
        }
        Statement::Set {
            target,
            operator,
            value,
        } => {
            set_target(target, *operator, value, ctx)?;
            Ok(Flow::Continue)
        }
        Statement::Unset { target } | Statement::Remove { target } => {
            unset_target(target, ctx);
            Ok(Flow::Continue)
        }
        Statement::Add { target, value } => {
            add_target(target, value, ctx)?;
            Ok(Flow::Continue)
        }
        Statement::Declare {
            name,
            type_name,
            initial,
        } => {
            let stripped = name.strip_prefix("var.").unwrap_or(name);
            let value = match initial {
                Some(expr) => evaluate(expr, ctx)?,
                None => default_for_type(type_name),
            };
            ctx.locals.insert(stripped.to_string(), value);
            Ok(Flow::Continue)
        }
        Statement::Return { action } => Ok(Flow::Return(action.clone())),
        Statement::Error { status, message } => {
            let status_value = evaluate(status, ctx)?;
            ctx.obj.set_scalar("status", status_value);
            if let Some(msg) = message {
                let msg_value = evaluate(msg, ctx)?;
                ctx.obj.set_scalar("response", msg_value);
            }
            if let Some(error_sub) = subroutines.get("vcl_error") {
                let _ = run_subroutine(error_sub, ctx, subroutines);
            }
            Ok(Flow::Return("error".to_string()))
        }
        Statement::Log { message } => {
            let text = evaluate(message, ctx)?.as_string();
            tracing::debug!(target: "vcl.log", "{text}");
            Ok(Flow::Continue)
        }
        Statement::Synthetic { content } => {
            let text = evaluate(content, ctx)?.as_string();
            ctx.obj.set_scalar("response", Value::String(text));
            set_default_content_type(ctx);
            Ok(Flow::Continue)
        }
        Statement::SyntheticBase64 { encoded } => {
            let encoded_text = evaluate(encoded, ctx)?.as_string();
            let decoded = BASE64
                .decode(encoded_text.as_bytes())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .unwrap_or(encoded_text);
            ctx.obj.set_scalar("response", Value::String(decoded));
            set_default_content_type(ctx);
            Ok(Flow::Continue)
        }
        Statement::HashData { value } => {
            let text = evaluate(value, ctx)?.as_string();
            let digest = crate::stdlib::digest::md5_hex(text.as_bytes());
            ctx.hash_data.push(digest);
            Ok(Flow::Continue)
        }
        Statement::Goto { label } => Ok(Flow::Goto(label.clone())),
        Statement::Label { inner, .. } => match inner {
            Some(stmt) => exec_statement(stmt, ctx, subroutines),
            None => Ok(Flow::Continue),
        },
        Statement::Restart => {
            let max = ctx.config.max_restarts;
            if ctx.restarts() as u32 >= max {
                return Err(EngineError::MaxRestartsExceeded { max });
            }
            let next = ctx.restarts() + 1;
            ctx.req.set_scalar("restarts", Value::Integer(next));
            Ok(Flow::Return("restart".to_string()))
        }
        Statement::Call { name, args } => exec_call(name, args, ctx, subroutines),
        Statement::Switch { subject, cases } => exec_switch(subject, cases, ctx, subroutines),
        Statement::Esi => {
            ctx.beresp.set_scalar("do_esi", Value::Bool(true));
            tracing::debug!("esi requested; fragment processing is out of scope");
            Ok(Flow::Continue)
        }
    }
}

/// Set the default synthetic-response content type only when the VCL
/// program hasn't already set one (§4: "default content-type
/// text/html; charset=utf-8").
fn set_default_content_type(ctx: &mut Context) {
    if ctx.resp.http.get("Content-Type").is_none() {
        ctx.resp.http.set("Content-Type", "text/html; charset=utf-8");
    }
}

fn exec_call(
    name: &str,
    args: &[Expression],
    ctx: &mut Context,
    subroutines: &SubroutineMap,
) -> Result<Flow, EngineError> {
    let callee = match subroutines.get(name) {
        Some(c) => c.clone(),
        None => {
            ctx.push_diagnostic(Diagnostic::warning(
                crate::diagnostics::DiagnosticCode::UnknownIdentifier,
                format!("call to undefined subroutine {name}"),
            ));
            return Ok(Flow::Continue);
        }
    };

    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(evaluate(arg, ctx)?);
    }
    for (param, value) in callee.params.iter().zip(values.into_iter()) {
        ctx.locals.insert(param.name.clone(), value);
    }

    let result = run_subroutine(&callee, ctx, subroutines);

    if is_canonical_action(&result) {
        Ok(Flow::Return(result))
    } else if callee.return_type.is_some() {
        ctx.locals
            .insert("__return_value__".to_string(), Value::String(result));
        Ok(Flow::Continue)
    } else {
        Ok(Flow::Continue)
    }
}

fn exec_switch(
    subject: &Expression,
    cases: &[SwitchCase],
    ctx: &mut Context,
    subroutines: &SubroutineMap,
) -> Result<Flow, EngineError> {
    let subject_value = evaluate(subject, ctx)?;
    let mut matched = false;
    let mut running = false;

    for case in cases {
        if !running {
            matched = match &case.test {
                Some(test_expr) => {
                    let test_value = evaluate(test_expr, ctx)?;
                    values_strict_equal(&subject_value, &test_value)
                }
                None => !matched && !has_any_prior_match(cases, case),
            };
            if !matched {
                continue;
            }
            running = true;
        }

        let flow = exec_block(&case.body, ctx, subroutines)?;
        if flow != Flow::Continue {
            return Ok(flow);
        }
        if !case.fallthrough {
            return Ok(Flow::Continue);
        }
    }

    Ok(Flow::Continue)
}

fn has_any_prior_match(_cases: &[SwitchCase], _current: &SwitchCase) -> bool {
    // `default` matches only if no prior case matched; since we scan
    // cases in order and only consider `default` once `matched` is
    // still false by the time we reach it, the outer loop's `matched`
    // flag already encodes this — this helper exists for clarity at
    // the call site and always returns false (no case before
    // `default` remains unvisited at this point in the scan).
    false
}

fn values_strict_equal(a: &Value, b: &Value) -> bool {
    a.as_string() == b.as_string()
}

fn default_for_type(type_name: &str) -> Value {
    match type_name.to_ascii_uppercase().as_str() {
        "STRING" => Value::String(String::new()),
        "INTEGER" | "INT" => Value::Integer(0),
        "FLOAT" => Value::Float(0.0),
        "BOOL" | "BOOLEAN" => Value::Bool(false),
        "TIME" => Value::Time(0),
        "RTIME" => Value::Rtime(0),
        "IP" => Value::Ip("0.0.0.0".to_string()),
        _ => Value::Null,
    }
}

const KNOWN_SCALAR_TARGETS: &[&str] = &[
    "req.url",
    "req.method",
    "req.restarts",
    "bereq.url",
    "bereq.method",
    "resp.status",
    "resp.response",
    "beresp.status",
    "beresp.response",
    "obj.status",
    "obj.response",
    "obj.ttl",
    "obj.grace",
    "obj.hits",
    "beresp.cacheable",
    "beresp.do_stream",
    "beresp.gzip",
    "beresp.brotli",
    "beresp.saintmode",
    "beresp.stale_if_error",
    "req.hash_always_miss",
    "req.hash_ignore_busy",
    "req.is_ssl",
    "req.esi",
    "req.grace",
    "req.max_stale_if_error",
    "req.max_stale_while_revalidate",
    "bereq.connect_timeout",
    "bereq.first_byte_timeout",
    "bereq.between_bytes_timeout",
];

fn set_target(
    target: &str,
    operator: CompoundOp,
    value_expr: &Expression,
    ctx: &mut Context,
) -> Result<(), EngineError> {
    let new_value = evaluate(value_expr, ctx)?;
    let parts: Vec<&str> = target.split('.').collect();

    match parts.as_slice() {
        [ns, "http", name] if ctx.namespace(ns).is_some() => {
            let existing = ctx
                .namespace(ns)
                .and_then(|o| o.http.get(name))
                .map(|s| Value::String(s.to_string()))
                .unwrap_or_else(|| Value::String(String::new()));
            let resolved = apply_compound(&existing, operator, &new_value)?;
            ctx.namespace_mut(ns).unwrap().http.set(name, resolved.as_string());
        }
        ["req", "backend"] => {
            let backend_name = if let Expression::Identifier(id) = value_expr {
                id.clone()
            } else {
                new_value.as_string()
            };
            ctx.req
                .set_scalar("backend", Value::BackendRef(backend_name.clone()));
            if ctx.backends.contains(&backend_name) {
                ctx.current_backend = Some(backend_name);
            }
        }
        ["beresp", field @ ("ttl" | "grace" | "stale_while_revalidate")] => {
            let seconds = parse_time_value_seconds(&new_value.as_string()).unwrap_or(0);
            ctx.beresp.set_scalar(*field, Value::Integer(seconds));
        }
        ["beresp", "do_esi"] => {
            let flag = new_value.as_bool();
            ctx.beresp.set_scalar("do_esi", Value::Bool(flag));
            ctx.resp.http.set("X-ESI", flag.to_string());
        }
        ["var", rest @ ..] => {
            let name = rest.join(".");
            let existing = ctx.locals.get(&name).cloned().unwrap_or(Value::String(String::new()));
            let resolved = apply_compound(&existing, operator, &new_value)?;
            ctx.locals.insert(name, resolved);
        }
        ["client", "identity"] => {
            ctx.client.identity = new_value.as_string();
        }
        [ns, rest @ ..] if ctx.namespace(ns).is_some() => {
            let name = rest.join(".");
            let full = format!("{ns}.{name}");
            if KNOWN_SCALAR_TARGETS.contains(&full.as_str()) {
                let existing = ctx
                    .namespace(ns)
                    .and_then(|o| o.scalar(&name))
                    .cloned()
                    .unwrap_or(Value::String(String::new()));
                let resolved = apply_compound(&existing, operator, &new_value)?;
                ctx.namespace_mut(ns).unwrap().set_scalar(name, resolved);
            }
            // Otherwise: unknown property, silently ignored (§4.2 rule 7).
        }
        _ => {}
    }
    Ok(())
}

fn unset_target(target: &str, ctx: &mut Context) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.as_slice() {
        [ns, "http", name] if ctx.namespace(ns).is_some() => {
            ctx.namespace_mut(ns).unwrap().http.unset(name);
        }
        ["var", rest @ ..] => {
            let name = rest.join(".");
            ctx.locals.remove(&name);
        }
        _ => {}
    }
}

fn add_target(target: &str, value_expr: &Expression, ctx: &mut Context) -> Result<(), EngineError> {
    let value = evaluate(value_expr, ctx)?;
    let parts: Vec<&str> = target.split('.').collect();
    if let [ns, "http", name] = parts.as_slice() {
        if ctx.namespace(ns).is_some() {
            ctx.namespace_mut(ns).unwrap().http.add(name, value.as_string());
        }
    }
    Ok(())
}

/// Apply a compound assignment operator. `+=` concatenates when the
/// current target value is a string (headers always are); numeric
/// operators otherwise coerce both sides. `/=`/`%=` with a zero right
/// operand are fatal within the statement (§4.2).
fn apply_compound(
    existing: &Value,
    operator: CompoundOp,
    new_value: &Value,
) -> Result<Value, EngineError> {
    Ok(match operator {
        CompoundOp::Assign => new_value.clone(),
        CompoundOp::Add => {
            if let Value::String(s) = existing {
                Value::String(format!("{s}{}", new_value.as_string()))
            } else if let (Value::Integer(a), Value::Integer(b)) = (existing, coerce_like(existing, new_value)) {
                Value::Integer(a + b)
            } else {
                Value::Float(existing.as_f64() + new_value.as_f64())
            }
        }
        CompoundOp::Sub => Value::Float(existing.as_f64() - new_value.as_f64()),
        CompoundOp::Mul => Value::Float(existing.as_f64() * new_value.as_f64()),
        CompoundOp::Div => {
            if new_value.as_f64() == 0.0 {
                return Err(EngineError::DivisionByZero);
            }
            Value::Float(existing.as_f64() / new_value.as_f64())
        }
        CompoundOp::Mod => {
            if new_value.as_i64() == 0 {
                return Err(EngineError::ModuloByZero);
            }
            Value::Integer(existing.as_i64() % new_value.as_i64())
        }
        CompoundOp::And => Value::Bool(existing.as_bool() && new_value.as_bool()),
        CompoundOp::Or => Value::Bool(existing.as_bool() || new_value.as_bool()),
        CompoundOp::BitAnd => Value::Integer(existing.as_i64() & new_value.as_i64()),
        CompoundOp::BitOr => Value::Integer(existing.as_i64() | new_value.as_i64()),
        CompoundOp::BitXor => Value::Integer(existing.as_i64() ^ new_value.as_i64()),
        CompoundOp::Shl => Value::Integer(existing.as_i64() << new_value.as_i64()),
        CompoundOp::Shr => Value::Integer(existing.as_i64() >> new_value.as_i64()),
    })
}

fn coerce_like(existing: &Value, other: &Value) -> Value {
    match existing {
        Value::Integer(_) => Value::Integer(other.as_i64()),
        _ => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expression;
    use std::collections::HashMap;

    fn empty_subs() -> SubroutineMap {
        HashMap::new()
    }

    #[test]
    fn set_header_then_read_back() {
        let mut ctx = Context::new();
        set_target("req.http.X", CompoundOp::Assign, &Expression::string("hi"), &mut ctx).unwrap();
        assert_eq!(ctx.req.http.get("X"), Some("hi"));
    }

    #[test]
    fn compound_add_on_string_header_concatenates() {
        let mut ctx = Context::new();
        set_target("req.http.X", CompoundOp::Assign, &Expression::string("Hello"), &mut ctx).unwrap();
        set_target(
            "req.http.X",
            CompoundOp::Add,
            &Expression::string(", World!"),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(ctx.req.http.get("X"), Some("Hello, World!"));
    }

    #[test]
    fn compound_add_on_string_number_still_concatenates() {
        let mut ctx = Context::new();
        set_target("req.http.Y", CompoundOp::Assign, &Expression::string("10"), &mut ctx).unwrap();
        set_target("req.http.Y", CompoundOp::Add, &Expression::integer(5), &mut ctx).unwrap();
        assert_eq!(ctx.req.http.get("Y"), Some("105"));
    }

    #[test]
    fn ttl_suffix_parses_to_seconds() {
        let mut ctx = Context::new();
        set_target("beresp.ttl", CompoundOp::Assign, &Expression::string("24h"), &mut ctx).unwrap();
        assert_eq!(ctx.beresp.scalar("ttl"), Some(&Value::Integer(86400)));
    }

    #[test]
    fn unset_header_then_read_is_empty() {
        let mut ctx = Context::new();
        set_target("req.http.X", CompoundOp::Assign, &Expression::string("hi"), &mut ctx).unwrap();
        unset_target("req.http.X", &mut ctx);
        assert_eq!(ctx.req.http.get("X"), None);
    }

    #[test]
    fn restart_increments_and_caps_at_max() {
        let mut ctx = Context::new();
        let subs = empty_subs();
        for _ in 0..4 {
            let flow = exec_statement(&Statement::Restart, &mut ctx, &subs).unwrap();
            assert_eq!(flow, Flow::Return("restart".to_string()));
        }
        assert_eq!(ctx.restarts(), 4);
        let err = exec_statement(&Statement::Restart, &mut ctx, &subs);
        assert!(err.is_err());
    }

    #[test]
    fn division_by_zero_is_fatal_in_set() {
        let mut ctx = Context::new();
        set_target("var.x", CompoundOp::Assign, &Expression::integer(10), &mut ctx).unwrap();
        let result = set_target("var.x", CompoundOp::Div, &Expression::integer(0), &mut ctx);
        assert!(result.is_err());
    }

    #[test]
    fn hash_data_appends_md5_hex() {
        let mut ctx = Context::new();
        let subs = empty_subs();
        exec_statement(
            &Statement::hash_data(Expression::string("req.url")),
            &mut ctx,
            &subs,
        )
        .unwrap();
        assert_eq!(ctx.hash_data.len(), 1);
        assert_eq!(ctx.hash_data[0].len(), 32);
    }

    #[test]
    fn synthetic_sets_default_content_type_when_unset() {
        let mut ctx = Context::new();
        let subs = empty_subs();
        exec_statement(&Statement::synthetic(Expression::string("hi")), &mut ctx, &subs).unwrap();
        assert_eq!(ctx.resp.http.get("Content-Type"), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn synthetic_does_not_override_an_existing_content_type() {
        let mut ctx = Context::new();
        let subs = empty_subs();
        ctx.resp.http.set("Content-Type", "application/json");
        exec_statement(&Statement::synthetic(Expression::string("{}")), &mut ctx, &subs).unwrap();
        assert_eq!(ctx.resp.http.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn switch_default_only_matches_without_prior_match() {
        use crate::ast::SwitchCase;
        let mut ctx = Context::new();
        let subs = empty_subs();
        let stmt = Statement::switch(
            Expression::string("b"),
            vec![
                SwitchCase::case(Expression::string("a"), vec![Statement::set("var.hit", Expression::string("a"))]),
                SwitchCase::default(vec![Statement::set("var.hit", Expression::string("default"))]),
            ],
        );
        exec_statement(&stmt, &mut ctx, &subs).unwrap();
        assert_eq!(ctx.locals.get("hit"), Some(&Value::String("default".to_string())));
    }
}
