//! `time.*`: TIME/RTIME arithmetic and conversions.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::context::Context;
use crate::error::EngineError;
use crate::value::{parse_time_value_seconds, Value};

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn dispatch(func: &str, args: &[Value], _ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let v = match func {
        "now" => Value::Time(now_secs()),
        "add" => {
            let base = args.first().map(Value::as_i64).unwrap_or(0);
            let delta = args
                .get(1)
                .map(Value::as_string)
                .and_then(|s| parse_time_value_seconds(&s))
                .unwrap_or(0);
            Value::Time(base + delta)
        }
        "sub" => {
            let base = args.first().map(Value::as_i64).unwrap_or(0);
            let delta = args
                .get(1)
                .map(Value::as_string)
                .and_then(|s| parse_time_value_seconds(&s))
                .unwrap_or(0);
            Value::Time(base - delta)
        }
        "is_after" => {
            let a = args.first().map(Value::as_i64).unwrap_or(0);
            let b = args.get(1).map(Value::as_i64).unwrap_or(0);
            Value::Bool(a > b)
        }
        "hex_to_time" => {
            let hex = args.first().map(Value::as_string).unwrap_or_default();
            let parsed = i64::from_str_radix(hex.trim_start_matches("0x"), 16).unwrap_or(0);
            Value::Time(parsed)
        }
        "units" => Value::Float(args.first().map(Value::as_f64).unwrap_or(0.0) / 1000.0),
        "runits" => Value::Float(args.first().map(Value::as_f64).unwrap_or(0.0) * 1000.0),
        "interval_elapsed_ratio" => {
            let start = args.first().map(Value::as_f64).unwrap_or(0.0);
            let end = args.get(1).map(Value::as_f64).unwrap_or(0.0);
            let now = args.get(2).map(Value::as_f64).unwrap_or(0.0);
            let span = end - start;
            if span <= 0.0 {
                Value::Float(1.0)
            } else {
                Value::Float(((now - start) / span).clamp(0.0, 1.0))
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}
