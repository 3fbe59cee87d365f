//! `table.*`: typed lookups against registered named tables.

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

fn lookup_raw(ctx: &Context, table_name: &str, key: &str) -> Option<Value> {
    ctx.tables.get(table_name).and_then(|t| t.get(key)).cloned()
}

pub fn dispatch(func: &str, args: &[Value], ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let table_name = args.first().map(Value::as_string).unwrap_or_default();
    let key = args.get(1).map(Value::as_string).unwrap_or_default();
    let default = args.get(2).cloned();

    let found = lookup_raw(ctx, &table_name, &key);

    let v = match func {
        "lookup" => found.or(default).unwrap_or_else(|| Value::String(String::new())),
        "lookup_bool" => found.map(|v| Value::Bool(v.as_bool())).or(default).unwrap_or(Value::Bool(false)),
        "lookup_integer" => found.map(|v| Value::Integer(v.as_i64())).or(default).unwrap_or(Value::Integer(0)),
        "lookup_float" => found.map(|v| Value::Float(v.as_f64())).or(default).unwrap_or(Value::Float(0.0)),
        "lookup_ip" => found.or(default).unwrap_or_else(|| Value::Ip(String::new())),
        "lookup_rtime" => found
            .or(default)
            .map(|v| Value::Rtime(v.as_i64()))
            .unwrap_or(Value::Rtime(0)),
        "lookup_acl" => found.or(default).unwrap_or_else(|| Value::Bool(false)),
        "lookup_backend" => found.or(default).unwrap_or_else(|| Value::BackendRef(String::new())),
        "lookup_regex" => found.or(default).unwrap_or_else(|| Value::String(String::new())),
        "contains" => Value::Bool(ctx.tables.get(&table_name).map(|t| t.get(&key).is_some()).unwrap_or(false)),
        _ => return Ok(None),
    };
    Ok(Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Program, TableDecl};

    fn ctx_with_table() -> Context {
        let program = Program::new().with_table(
            TableDecl::new("countries")
                .with_entry("US", Value::string("United States"))
                .with_entry("FR", Value::string("France")),
        );
        Context::from_program(&program, crate::config::EngineConfig::default())
    }

    #[test]
    fn lookup_known_key() {
        let mut ctx = ctx_with_table();
        let result = dispatch(
            "lookup",
            &[Value::string("countries"), Value::string("US")],
            &mut ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.as_string(), "United States");
    }

    #[test]
    fn lookup_missing_key_falls_back_to_default_arg() {
        let mut ctx = ctx_with_table();
        let result = dispatch(
            "lookup",
            &[Value::string("countries"), Value::string("DE"), Value::string("Unknown")],
            &mut ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.as_string(), "Unknown");
    }

    #[test]
    fn contains_reports_key_presence() {
        let mut ctx = ctx_with_table();
        assert!(dispatch("contains", &[Value::string("countries"), Value::string("US")], &mut ctx)
            .unwrap()
            .unwrap()
            .as_bool());
        assert!(!dispatch("contains", &[Value::string("countries"), Value::string("DE")], &mut ctx)
            .unwrap()
            .unwrap()
            .as_bool());
    }
}
