//! `bin.*`: raw binary <-> textual encoding conversions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

pub fn dispatch(func: &str, args: &[Value], _ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let input = args.first().map(Value::as_string).unwrap_or_default();

    let v = match func {
        "base64_to_hex" => match STANDARD.decode(input.as_bytes()) {
            Ok(bytes) => Value::String(hex::encode(bytes)),
            Err(_) => Value::Null,
        },
        "hex_to_base64" => match hex::decode(&input) {
            Ok(bytes) => Value::String(STANDARD.encode(bytes)),
            Err(_) => Value::Null,
        },
        "data_convert" => {
            let from = args.get(1).map(Value::as_string).unwrap_or_default();
            let to = args.get(2).map(Value::as_string).unwrap_or_default();
            convert(&input, &from, &to)
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}

fn convert(input: &str, from: &str, to: &str) -> Value {
    let bytes = match from {
        "hex" => hex::decode(input).ok(),
        "base64" => STANDARD.decode(input.as_bytes()).ok(),
        "plain" => Some(input.as_bytes().to_vec()),
        _ => None,
    };
    let Some(bytes) = bytes else { return Value::Null };
    match to {
        "hex" => Value::String(hex::encode(bytes)),
        "base64" => Value::String(STANDARD.encode(bytes)),
        "plain" => Value::String(String::from_utf8_lossy(&bytes).to_string()),
        _ => Value::Null,
    }
}
