//! The typed value domain and coercion rules.
//!
//! VCL expressions and Context fields are dynamically typed from the
//! author's perspective but must be represented as an explicit tagged
//! sum here: coercion between variants is an explicit operator table,
//! never implicit dispatch on a runtime shape.

use std::fmt;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1};
use nom::combinator::{opt, recognize};
use nom::sequence::{pair, tuple};
use nom::IResult;

/// A VCL runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Seconds since epoch (or a TTL-style duration in seconds).
    Time(i64),
    /// Milliseconds, for RTIME-typed fields.
    Rtime(i64),
    Ip(String),
    /// A regex literal, stored as source pattern text; compiled lazily
    /// by the evaluator at the point of use.
    Regex(String),
    BackendRef(String),
    Null,
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthy semantics used by `&&`/`||`/`if`: non-empty string,
    /// non-zero number, true boolean. Null and empty string are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::String(s) => !s.is_empty(),
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::Time(t) | Value::Rtime(t) => *t != 0,
            Value::Ip(s) => !s.is_empty(),
            Value::Regex(s) => !s.is_empty(),
            Value::BackendRef(s) => !s.is_empty(),
            Value::Null => false,
        }
    }

    /// String coercion used for concatenation, header assignment and
    /// regex matching against the stringified left operand.
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Bool(b) => b.to_string(),
            Value::Time(t) | Value::Rtime(t) => t.to_string(),
            Value::Ip(s) => s.clone(),
            Value::Regex(s) => s.clone(),
            Value::BackendRef(s) => s.clone(),
            Value::Null => String::new(),
        }
    }

    /// Numeric coercion: non-numeric strings coerce to NaN-as-zero per
    /// §4.3's binary-operator rule ("implicit string→number coercion,
    /// NaN→0").
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Time(t) | Value::Rtime(t) => *t as f64,
            Value::Ip(_) | Value::Regex(_) | Value::BackendRef(_) | Value::Null => 0.0,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            Value::Integer(i) => *i,
            Value::Time(t) | Value::Rtime(t) => *t,
            other => other.as_f64() as i64,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            other => other.is_truthy(),
        }
    }

    /// Whether this value, when serialized as the right side of `set`,
    /// was written as a bare numeric-looking string (used by compound
    /// `+=` to decide string-concat vs numeric-add on string targets).
    pub fn looks_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

/// Render a float the way VCL numeric-to-string coercion is expected
/// to: integral floats without a trailing `.0` noise is NOT what VCL
/// does (it keeps a decimal point), but we trim excess precision.
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{:.1}", f)
    } else {
        let s = format!("{}", f);
        s
    }
}

/// Parse a VCL time-value literal such as `24h`, `500ms`, `12` into a
/// duration expressed in the given base unit.
///
/// Per §6.5: integer or real, optionally followed by a unit suffix
/// `ms|s|m|h|d`; absent suffix means seconds (or ms at RTIME call
/// sites, handled by the caller passing `TimeUnit::Milliseconds` as
/// the default). Quoted literals are trimmed of surrounding quotes by
/// the caller before reaching this function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultUnit {
    Seconds,
    Milliseconds,
}

pub fn parse_time_value(input: &str, default: DefaultUnit) -> Option<f64> {
    let trimmed = input.trim().trim_matches('"');
    let (number_part, unit_part) = split_number_and_unit(trimmed)?;
    let number: f64 = number_part.parse().ok()?;
    let seconds = match unit_part {
        "" => {
            return Some(match default {
                DefaultUnit::Seconds => number,
                DefaultUnit::Milliseconds => number / 1000.0,
            })
        }
        "ms" => number / 1000.0,
        "s" => number,
        "m" => number * 60.0,
        "h" => number * 3600.0,
        "d" => number * 86400.0,
        _ => return None,
    };
    Some(seconds)
}

/// Parse the leading signed-decimal number and trailing unit suffix of
/// a VCL time-value literal using a narrow nom grammar (§6.5), rather
/// than a general-purpose number parser: this crate never parses VCL
/// source text itself, so `nom` is scoped to exactly this one
/// sub-grammar.
fn signed_decimal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(alt((char('-'), char('+')))),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)
}

fn unit_suffix(input: &str) -> IResult<&str, &str> {
    alt((tag("ms"), tag("s"), tag("m"), tag("h"), tag("d")))(input)
}

fn split_number_and_unit(s: &str) -> Option<(&str, &str)> {
    let (rest, number) = signed_decimal(s).ok()?;
    if number.is_empty() {
        return None;
    }
    if rest.is_empty() {
        return Some((number, ""));
    }
    let (rest, unit) = unit_suffix(rest).ok()?;
    if !rest.is_empty() {
        return None;
    }
    Some((number, unit))
}

/// Same as `split_number_and_unit` but succeeds on an unsuffixed input
/// too (the whole string is numeric).
pub fn parse_time_value_seconds(input: &str) -> Option<i64> {
    let trimmed = input.trim().trim_matches('"');
    if let Some((num, unit)) = split_number_and_unit(trimmed) {
        let number: f64 = num.parse().ok()?;
        let secs = match unit {
            "" => number,
            "ms" => number / 1000.0,
            "s" => number,
            "m" => number * 60.0,
            "h" => number * 3600.0,
            "d" => number * 86400.0,
            _ => return None,
        };
        Some(secs as i64)
    } else {
        trimmed.parse::<f64>().ok().map(|n| n as i64)
    }
}
