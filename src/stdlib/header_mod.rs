//! `header.*`: header accessors keyed by namespace name (`req`,
//! `bereq`, `beresp`, `resp`, `obj`), mirroring Fastly's `header.get(req, ...)`
//! calling convention.

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

pub fn dispatch(func: &str, args: &[Value], ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let ns = args.first().map(Value::as_string).unwrap_or_default();
    let name = args.get(1).map(Value::as_string).unwrap_or_default();

    let v = match func {
        "get" => {
            let value = ctx.namespace(&ns).and_then(|o| o.http.get(&name)).map(str::to_string);
            value.map(Value::String).unwrap_or(Value::Null)
        }
        "set" => {
            let value = args.get(2).map(Value::as_string).unwrap_or_default();
            if let Some(obj) = ctx.namespace_mut(&ns) {
                obj.http.set(&name, value);
            }
            Value::Bool(true)
        }
        "unset" => {
            if let Some(obj) = ctx.namespace_mut(&ns) {
                obj.http.unset(&name);
            }
            Value::Bool(true)
        }
        "filter" => {
            let patterns: Vec<String> = args[1..].iter().map(Value::as_string).collect();
            filter_headers(ctx, &ns, &patterns, true);
            Value::Bool(true)
        }
        "filter_except" => {
            let patterns: Vec<String> = args[1..].iter().map(Value::as_string).collect();
            filter_headers(ctx, &ns, &patterns, false);
            Value::Bool(true)
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}

fn filter_headers(ctx: &mut Context, ns: &str, patterns: &[String], remove_matching: bool) {
    let Some(obj) = ctx.namespace_mut(ns) else { return };
    let lowered: Vec<String> = patterns.iter().map(|p| p.to_ascii_lowercase()).collect();
    let doomed: Vec<String> = obj
        .http
        .iter()
        .filter(|(name, _)| {
            let matches = lowered.iter().any(|p| name.to_ascii_lowercase() == *p);
            matches == remove_matching
        })
        .map(|(name, _)| name.to_string())
        .collect();
    for name in doomed {
        obj.http.unset(&name);
    }
}
