//! `std.*`: general string/number/type-conversion helpers.
//!
//! Named `std_mod` rather than `std` since the latter is a reserved
//! module path.

use crate::context::Context;
use crate::diagnostics::Diagnostic;
use crate::error::EngineError;
use crate::ip::parse_ip;
use crate::value::{parse_time_value_seconds, Value};

pub fn dispatch(func: &str, args: &[Value], ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let s = |i: usize| args.get(i).map(Value::as_string).unwrap_or_default();

    let v = match func {
        "strlen" => Value::Integer(s(0).chars().count() as i64),
        "tolower" => Value::String(s(0).to_lowercase()),
        "toupper" => Value::String(s(0).to_uppercase()),
        "strstr" => {
            let haystack = s(0);
            let needle = s(1);
            match haystack.find(&needle) {
                Some(idx) => Value::String(haystack[idx..].to_string()),
                None => Value::String(String::new()),
            }
        }
        "prefixof" => Value::Bool(s(0).starts_with(&s(1))),
        "suffixof" => Value::Bool(s(0).ends_with(&s(1))),
        "integer" => Value::Integer(args.first().map(Value::as_i64).unwrap_or(0)),
        "real" => Value::Float(args.first().map(Value::as_f64).unwrap_or(0.0)),
        "ip" => {
            let candidate = s(0);
            if parse_ip(&candidate).is_some() {
                Value::Ip(candidate)
            } else {
                let fallback = args.get(1).cloned().unwrap_or(Value::Ip(String::new()));
                fallback
            }
        }
        "time" => {
            let candidate = s(0);
            match parse_time_value_seconds(&candidate) {
                Some(secs) => Value::Time(secs),
                None => args.get(1).cloned().unwrap_or(Value::Time(0)),
            }
        }
        "duration" => {
            let candidate = s(0);
            match parse_time_value_seconds(&candidate) {
                Some(secs) => Value::Rtime(secs * 1000),
                None => args.get(1).cloned().unwrap_or(Value::Rtime(0)),
            }
        }
        "collect" => Value::String(s(0)),
        "replace" => Value::String(s(0).replacen(&s(1), &s(2), 1)),
        "replaceall" => Value::String(s(0).replace(&s(1), &s(2))),
        "round" => Value::Float(args.first().map(Value::as_f64).unwrap_or(0.0).round()),
        "log" => {
            ctx.push_diagnostic(Diagnostic::warning(
                crate::diagnostics::DiagnosticCode::InvalidArgument,
                format!("std.log: {}", s(0)),
            ));
            Value::Bool(true)
        }
        "healthy" => Value::Bool(
            ctx.backends
                .get(&s(0))
                .map(|backend| backend.is_healthy)
                .unwrap_or(false),
        ),
        _ => return Ok(None),
    };
    Ok(Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strlen_counts_chars() {
        let mut ctx = Context::new();
        assert_eq!(dispatch("strlen", &[Value::string("hello")], &mut ctx).unwrap().unwrap().as_i64(), 5);
    }

    #[test]
    fn ip_falls_back_on_invalid_input() {
        let mut ctx = Context::new();
        let result = dispatch("ip", &[Value::string("not-an-ip"), Value::string("0.0.0.0")], &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(result.as_string(), "0.0.0.0");
    }

    #[test]
    fn replaceall_replaces_every_occurrence() {
        let mut ctx = Context::new();
        let result = dispatch("replaceall", &[Value::string("a-b-c"), Value::string("-"), Value::string("_")], &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(result.as_string(), "a_b_c");
    }
}
