//! `math.*`: trig, exponential/log, rounding, classification.

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

pub fn dispatch(func: &str, args: &[Value], _ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let a = args.first().map(Value::as_f64).unwrap_or(0.0);
    let b = args.get(1).map(Value::as_f64).unwrap_or(0.0);

    let v = match func {
        "sin" => Value::Float(a.sin()),
        "cos" => Value::Float(a.cos()),
        "tan" => Value::Float(a.tan()),
        "asin" => Value::Float(a.asin()),
        "acos" => Value::Float(a.acos()),
        "atan" => Value::Float(a.atan()),
        "atan2" => Value::Float(a.atan2(b)),
        "sinh" => Value::Float(a.sinh()),
        "cosh" => Value::Float(a.cosh()),
        "tanh" => Value::Float(a.tanh()),
        "exp" => Value::Float(a.exp()),
        "exp2" => Value::Float(a.exp2()),
        "log" => Value::Float(a.ln()),
        "log2" => Value::Float(a.log2()),
        "log10" => Value::Float(a.log10()),
        "sqrt" => Value::Float(a.sqrt()),
        "cbrt" => Value::Float(a.cbrt()),
        "pow" => Value::Float(a.powf(b)),
        "abs" => Value::Float(a.abs()),
        "ceil" => Value::Float(a.ceil()),
        "floor" => Value::Float(a.floor()),
        "round" => Value::Float(a.round()),
        "roundeven" => Value::Float(round_half_to_even(a)),
        "roundhalfup" => Value::Float((a + 0.5).floor()),
        "roundhalfdown" => Value::Float((a - 0.5).ceil()),
        "trunc" => Value::Float(a.trunc()),
        "fmod" => {
            if b == 0.0 {
                return Err(EngineError::ModuloByZero);
            }
            Value::Float(a % b)
        }
        "is_nan" => Value::Bool(a.is_nan()),
        "is_finite" => Value::Bool(a.is_finite()),
        "is_infinite" => Value::Bool(a.is_infinite()),
        "is_normal" => Value::Bool(a.is_normal()),
        "is_subnormal" => Value::Bool(matches!(a.classify(), std::num::FpCategory::Subnormal)),
        "min" => Value::Float(a.min(b)),
        "max" => Value::Float(a.max(b)),
        _ => return Ok(None),
    };
    Ok(Some(v))
}

/// Round half to even ("banker's rounding"): ties split toward the
/// nearest even integer instead of always away from zero.
fn round_half_to_even(x: f64) -> f64 {
    let floor = x.floor();
    let diff = x - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}
