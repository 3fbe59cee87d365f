//! The expression evaluator: literals, dotted-path identifiers,
//! unary/binary/ternary operators, and prefix-dispatched function
//! calls.

use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::context::Context;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::EngineError;
use crate::stdlib;
use crate::value::Value;

pub fn evaluate(expr: &Expression, ctx: &mut Context) -> Result<Value, EngineError> {
    Ok(match expr {
        Expression::StringLiteral(s) => Value::String(s.clone()),
        Expression::IntegerLiteral(i) => Value::Integer(*i),
        Expression::NumberLiteral(n) => Value::Float(*n),
        Expression::BoolLiteral(b) => Value::Bool(*b),
        Expression::RegexLiteral { pattern, .. } => Value::Regex(pattern.clone()),
        Expression::Identifier(path) => resolve_identifier(path, ctx),
        Expression::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            match op {
                UnaryOp::Not => Value::Bool(!value.is_truthy()),
                UnaryOp::Neg => Value::Float(-value.as_f64()),
            }
        }
        Expression::Binary { op, left, right } => evaluate_binary(*op, left, right, ctx)?,
        Expression::Ternary {
            test,
            consequent,
            alternate,
        } => {
            if evaluate(test, ctx)?.is_truthy() {
                evaluate(consequent, ctx)?
            } else {
                evaluate(alternate, ctx)?
            }
        }
        Expression::FunctionCall { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, ctx)?);
            }
            match stdlib::dispatch(name, &values, ctx)? {
                Some(value) => value,
                None => {
                    ctx.push_diagnostic(Diagnostic::unknown_function(name));
                    Value::Null
                }
            }
        }
        Expression::MemberAccess { object, property } => {
            // Only reached when the parser/builder produced a nested
            // member-access tree instead of a flat dotted Identifier;
            // both are equivalent, so fold to the same resolution path.
            let base = stringify_member_chain(object);
            resolve_identifier(&format!("{base}.{property}"), ctx)
        }
    })
}

fn stringify_member_chain(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(path) => path.clone(),
        Expression::MemberAccess { object, property } => {
            format!("{}.{}", stringify_member_chain(object), property)
        }
        other => format!("{other:?}"),
    }
}

fn evaluate_binary(
    op: BinaryOp,
    left: &Expression,
    right: &Expression,
    ctx: &mut Context,
) -> Result<Value, EngineError> {
    use BinaryOp::*;

    // Short-circuit logical operators return the last-evaluated
    // operand (truthy semantics), not a coerced boolean.
    match op {
        And => {
            let l = evaluate(left, ctx)?;
            return Ok(if !l.is_truthy() {
                l
            } else {
                evaluate(right, ctx)?
            });
        }
        Or => {
            let l = evaluate(left, ctx)?;
            return Ok(if l.is_truthy() { l } else { evaluate(right, ctx)? });
        }
        _ => {}
    }

    let l = evaluate(left, ctx)?;

    if op == Match {
        return Ok(evaluate_match_polarity(&l, right, ctx, false));
    }
    if op == NotMatch {
        return Ok(evaluate_match_polarity(&l, right, ctx, true));
    }

    let r = evaluate(right, ctx)?;

    Ok(match op {
        Concat => Value::String(format!("{}{}", l.as_string(), r.as_string())),
        Add => numeric_add(&l, &r),
        Sub => Value::Float(l.as_f64() - r.as_f64()),
        Mul => Value::Float(l.as_f64() * r.as_f64()),
        Div => {
            if r.as_f64() == 0.0 {
                return Err(EngineError::DivisionByZero);
            }
            Value::Float(l.as_f64() / r.as_f64())
        }
        Mod => {
            if r.as_i64() == 0 {
                return Err(EngineError::ModuloByZero);
            }
            Value::Integer(l.as_i64() % r.as_i64())
        }
        Eq => Value::Bool(values_equal(&l, &r)),
        NotEq => Value::Bool(!values_equal(&l, &r)),
        Lt => Value::Bool(l.as_f64() < r.as_f64()),
        Lte => Value::Bool(l.as_f64() <= r.as_f64()),
        Gt => Value::Bool(l.as_f64() > r.as_f64()),
        Gte => Value::Bool(l.as_f64() >= r.as_f64()),
        BitAnd => Value::Integer(l.as_i64() & r.as_i64()),
        BitOr => Value::Integer(l.as_i64() | r.as_i64()),
        BitXor => Value::Integer(l.as_i64() ^ r.as_i64()),
        And | Or | Match | NotMatch => unreachable!("handled above"),
    })
}

fn numeric_add(l: &Value, r: &Value) -> Value {
    if let (Value::Integer(a), Value::Integer(b)) = (l, r) {
        return Value::Integer(a + b);
    }
    Value::Float(l.as_f64() + r.as_f64())
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
            *a as f64 == *b
        }
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) => true,
        _ => l.as_string() == r.as_string(),
    }
}

/// `~` / `!~`: ACL membership when the right side names a registered
/// ACL, else a regex match against the stringified left operand.
fn evaluate_match_polarity(
    left: &Value,
    right: &Expression,
    ctx: &mut Context,
    negated: bool,
) -> Value {
    if let Expression::Identifier(name) = right {
        if ctx.acls.contains(name) {
            let ip = left.as_string();
            let is_member = crate::acl::test_membership(ctx.acls.get(name).unwrap(), &ip);
            return Value::Bool(is_member != negated);
        }
    }

    let pattern_value = evaluate(right, ctx).unwrap_or(Value::String(String::new()));
    let pattern = pattern_value.as_string();
    let haystack = left.as_string();

    match Regex::new(&pattern) {
        Ok(re) => {
            if let Some(captures) = re.captures(&haystack) {
                ctx.re_groups = captures
                    .iter()
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                Value::Bool(!negated)
            } else {
                ctx.re_groups.clear();
                Value::Bool(negated)
            }
        }
        Err(_) => {
            ctx.push_diagnostic(Diagnostic::invalid_regex(&pattern).with_statement_index(0));
            // Invalid regex yields the negated polarity of the operator.
            Value::Bool(negated)
        }
    }
}

pub fn resolve_identifier(path: &str, ctx: &Context) -> Value {
    if let Some(value) = ctx.overrides.get(path) {
        return value.clone();
    }

    let parts: Vec<&str> = path.split('.').collect();
    match parts.as_slice() {
        ["now"] => Value::Integer(now_millis()),
        ["now", "sec"] => Value::Integer(now_millis() / 1000),
        ["re", "group", n] => {
            let idx: usize = n.parse().unwrap_or(usize::MAX);
            ctx.re_groups
                .get(idx)
                .cloned()
                .map(Value::String)
                .unwrap_or_else(|| Value::String(String::new()))
        }
        ["var", rest @ ..] => {
            let name = rest.join(".");
            ctx.locals
                .get(&name)
                .cloned()
                .unwrap_or(Value::String(String::new()))
        }
        [ns, "http", name] if ctx.namespace(ns).is_some() => ctx
            .namespace(ns)
            .and_then(|o| o.http.get(name))
            .map(|s| Value::String(s.to_string()))
            .unwrap_or_else(|| Value::String(String::new())),
        [ns, "url", "path"] if ctx.namespace(ns).is_some() => {
            url_part(ctx, ns, UrlPart::Path)
        }
        [ns, "url", "qs"] if ctx.namespace(ns).is_some() => url_part(ctx, ns, UrlPart::Query),
        [ns, "url", "basename"] if ctx.namespace(ns).is_some() => {
            url_part(ctx, ns, UrlPart::Basename)
        }
        [ns, "url", "dirname"] if ctx.namespace(ns).is_some() => {
            url_part(ctx, ns, UrlPart::Dirname)
        }
        [ns, "url", "ext"] if ctx.namespace(ns).is_some() => url_part(ctx, ns, UrlPart::Ext),
        [ns, rest @ ..] if ctx.namespace(ns).is_some() => {
            let name = rest.join(".");
            ctx.namespace(ns)
                .and_then(|o| o.scalar(&name))
                .cloned()
                .unwrap_or_else(|| namespace_default(ns, &name))
        }
        ["client", "ip"] => Value::Ip(ctx.client.ip.clone()),
        ["client", "port"] => Value::Integer(ctx.client.port as i64),
        ["client", "identity"] => Value::String(ctx.client.identity.clone()),
        ["client", "requests"] => Value::Integer(ctx.client.requests),
        ["client", "geo", "country_code"] => Value::String(ctx.client.country_code.clone()),
        ["client", "geo", "continent_code"] => Value::String(ctx.client.continent_code.clone()),
        ["client", "geo", "latitude"] => Value::Float(ctx.client.latitude),
        ["client", "geo", "longitude"] => Value::Float(ctx.client.longitude),
        ["client", ..] => Value::String(String::new()),
        ["server", "hostname"] => Value::String(ctx.server.hostname.clone()),
        ["server", "identity"] => Value::String(ctx.server.identity.clone()),
        ["server", "datacenter"] => Value::String(ctx.server.datacenter.clone()),
        ["server", "region"] => Value::String(ctx.server.region.clone()),
        ["server", "pop"] => Value::String(ctx.server.pop.clone()),
        ["server", "billing_region"] => Value::String(ctx.server.billing_region.clone()),
        ["server", "ip"] => Value::Ip(ctx.server.ip.clone()),
        ["server", "port"] => Value::Integer(ctx.server.port as i64),
        ["math", constant] => math_constant(constant),
        _ => Value::String(String::new()),
    }
}

enum UrlPart {
    Path,
    Query,
    Basename,
    Dirname,
    Ext,
}

fn url_part(ctx: &Context, ns: &str, part: UrlPart) -> Value {
    let url = ctx
        .namespace(ns)
        .and_then(|o| o.scalar("url"))
        .map(|v| v.as_string())
        .unwrap_or_default();
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (url.clone(), String::new()),
    };
    Value::String(match part {
        UrlPart::Path => path,
        UrlPart::Query => query,
        UrlPart::Basename => path.rsplit('/').next().unwrap_or("").to_string(),
        UrlPart::Dirname => {
            match path.rfind('/') {
                Some(idx) => path[..idx].to_string(),
                None => String::new(),
            }
        }
        UrlPart::Ext => path
            .rsplit('/')
            .next()
            .and_then(|b| b.rsplit_once('.'))
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_default(),
    })
}

fn namespace_default(_ns: &str, _name: &str) -> Value {
    Value::String(String::new())
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn math_constant(name: &str) -> Value {
    use std::f64::consts::*;
    Value::Float(match name {
        "PI" => PI,
        "E" => E,
        "TAU" => TAU,
        "PHI" => 1.618_033_988_749_895,
        "LN2" => LN_2,
        "LN10" => LN_10,
        "LOG2E" => LOG2_E,
        "LOG10E" => LOG10_E,
        "SQRT2" => SQRT_2,
        "SQRT1_2" => FRAC_1_SQRT_2,
        "POS_INFINITY" => f64::INFINITY,
        "NEG_INFINITY" => f64::NEG_INFINITY,
        "NAN" => f64::NAN,
        "FLOAT_MAX" => f64::MAX,
        "FLOAT_MIN" => f64::MIN,
        "FLOAT_EPSILON" => f64::EPSILON,
        "INTEGER_MAX" => i64::MAX as f64,
        "INTEGER_MIN" => i64::MIN as f64,
        _ => return Value::String(String::new()),
    })
}

/// Public entry point used by `evaluate_binary`'s `Match`/`NotMatch`
/// arms (kept separate from the unreachable placeholder above so the
/// polarity is explicit at the call site).
pub fn evaluate_match_expr(left: &Value, right: &Expression, ctx: &mut Context, negated: bool) -> Value {
    evaluate_match_polarity(left, right, ctx, negated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AclDecl;

    fn ctx_with_header(ns: &str, name: &str, value: &str) -> Context {
        let mut ctx = Context::new();
        ctx.namespace_mut(ns).unwrap().http.set(name, value);
        ctx
    }

    #[test]
    fn resolves_header_identifier() {
        let ctx = ctx_with_header("req", "X-Foo", "bar");
        assert_eq!(resolve_identifier("req.http.X-Foo", &ctx).as_string(), "bar");
    }

    #[test]
    fn unknown_identifier_is_empty_string_never_fatal() {
        let ctx = Context::new();
        assert_eq!(resolve_identifier("totally.unknown.path", &ctx).as_string(), "");
    }

    #[test]
    fn client_geo_defaults() {
        let ctx = Context::new();
        assert_eq!(resolve_identifier("client.geo.country_code", &ctx).as_string(), "US");
    }

    #[test]
    fn math_constants() {
        let ctx = Context::new();
        let pi = resolve_identifier("math.PI", &ctx).as_f64();
        assert!((pi - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let mut ctx = Context::new();
        let expr = Expression::binary(BinaryOp::Div, Expression::integer(1), Expression::integer(0));
        assert!(evaluate(&expr, &mut ctx).is_err());
    }

    #[test]
    fn regex_match_sets_capture_groups() {
        let mut ctx = Context::new();
        let left = Value::String("/users/123".to_string());
        let right = Expression::string("^/users/([0-9]+)");
        let result = evaluate_match_expr(&left, &right, &mut ctx, false);
        assert!(result.as_bool());
        assert_eq!(ctx.re_groups[0], "/users/123");
        assert_eq!(ctx.re_groups[1], "123");
    }

    #[test]
    fn invalid_regex_yields_negated_polarity() {
        let mut ctx = Context::new();
        let left = Value::String("anything".to_string());
        let right = Expression::string("(unclosed");
        assert!(!evaluate_match_expr(&left, &right, &mut ctx, false).as_bool());
        assert!(evaluate_match_expr(&left, &right, &mut ctx, true).as_bool());
        assert_eq!(ctx.diagnostics.len(), 2);
    }

    #[test]
    fn acl_membership_via_tilde() {
        let mut ctx = Context::new();
        ctx.acls
            .insert("t", AclDecl::new("t").with_entry("192.168.0.0", Some(24)));
        let left = Value::Ip("192.168.0.10".to_string());
        let right = Expression::ident("t");
        assert!(evaluate_match_expr(&left, &right, &mut ctx, false).as_bool());
    }
}
