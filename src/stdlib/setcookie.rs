//! `setcookie.*`: parse and rewrite `Set-Cookie` header fields by name.

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

fn cookie_value(set_cookie: &str, name: &str) -> Option<String> {
    let first = set_cookie.split(';').next()?;
    let (k, v) = first.split_once('=')?;
    (k.trim() == name).then(|| v.trim().to_string())
}

pub fn dispatch(func: &str, args: &[Value], _ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let header = args.first().map(Value::as_string).unwrap_or_default();
    let name = args.get(1).map(Value::as_string).unwrap_or_default();

    let v = match func {
        "get_value_by_name" => cookie_value(&header, &name).map(Value::String).unwrap_or(Value::Null),
        "delete_by_name" => {
            if cookie_value(&header, &name).is_some() {
                Value::String(String::new())
            } else {
                Value::String(header)
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}
