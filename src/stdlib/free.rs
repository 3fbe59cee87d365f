//! Free (unprefixed, or exact-full-name) functions: `if`, `substr`,
//! `regsub`/`regsuball`, escaping helpers, randomness, and the
//! accept-and-ignore `h2.*`/`h3.*`/`fastly.*`/`resp.tarpit` surface.

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use rand::Rng;
use regex::Regex;

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

pub fn dispatch(func: &str, args: &[Value], ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    if func.starts_with("h2.") || func.starts_with("h3.") {
        return Ok(Some(Value::Bool(true)));
    }

    let s = |i: usize| args.get(i).map(Value::as_string).unwrap_or_default();

    let v = match func {
        "if" => {
            let cond = args.first().map(Value::is_truthy).unwrap_or(false);
            if cond {
                args.get(1).cloned().unwrap_or(Value::Null)
            } else {
                args.get(2).cloned().unwrap_or(Value::Null)
            }
        }
        "substr" => {
            let text = s(0);
            let chars: Vec<char> = text.chars().collect();
            let offset = normalize_offset(args.get(1).map(Value::as_i64).unwrap_or(0), chars.len());
            let len = args
                .get(2)
                .map(Value::as_i64)
                .map(|n| n.max(0) as usize)
                .unwrap_or(chars.len().saturating_sub(offset));
            let end = (offset + len).min(chars.len());
            Value::String(chars[offset.min(chars.len())..end].iter().collect())
        }
        "regsub" => regex_replace(&s(0), &s(1), &s(2), false, ctx),
        "regsuball" => regex_replace(&s(0), &s(1), &s(2), true, ctx),
        "urlencode" => Value::String(utf8_percent_encode(&s(0), NON_ALPHANUMERIC).to_string()),
        "urldecode" => Value::String(
            percent_decode_str(&s(0))
                .decode_utf8()
                .map(|cow| cow.to_string())
                .unwrap_or_else(|_| s(0)),
        ),
        "json.escape" | "json_escape" => Value::String(json_escape(&s(0))),
        "cstr_escape" => Value::String(cstr_escape(&s(0))),
        "xml_escape" => Value::String(xml_escape(&s(0))),
        "boltsort.sort" => Value::String(boltsort(&s(0))),
        "subfield" => {
            let haystack = s(0);
            let name = s(1);
            let sep = args.get(2).map(Value::as_string).unwrap_or_else(|| ";".to_string());
            subfield(&haystack, &name, &sep)
        }
        "randombool" => {
            let numerator = args.first().map(Value::as_f64).unwrap_or(1.0);
            let denominator = args.get(1).map(Value::as_f64).unwrap_or(2.0);
            let roll: f64 = rand::thread_rng().gen_range(0.0..denominator);
            Value::Bool(roll < numerator)
        }
        "randomint" => {
            let from = args.first().map(Value::as_i64).unwrap_or(0);
            let to = args.get(1).map(Value::as_i64).unwrap_or(from);
            if to <= from {
                Value::Integer(from)
            } else {
                Value::Integer(rand::thread_rng().gen_range(from..=to))
            }
        }
        "randomstr" => {
            let len = args.first().map(Value::as_i64).unwrap_or(8).max(0) as usize;
            let charset: Vec<char> = args
                .get(1)
                .map(Value::as_string)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789".to_string())
                .chars()
                .collect();
            let mut rng = rand::thread_rng();
            let out: String = (0..len)
                .map(|_| charset[rng.gen_range(0..charset.len().max(1))])
                .collect();
            Value::String(out)
        }
        "http_status_matches" => {
            let status = args.first().map(Value::as_i64).unwrap_or(0);
            let spec = s(1);
            Value::Bool(status_matches_spec(status, &spec))
        }
        "fastly.hash" => Value::String(format!("{:016x}", xxhash_rust::xxh64::xxh64(s(0).as_bytes(), 0))),
        "fastly.try_select_shield" => Value::String(s(0)),
        "resp.tarpit" => Value::Bool(true),
        "early_hints" => Value::Bool(true),
        _ => return Ok(None),
    };
    Ok(Some(v))
}

fn normalize_offset(offset: i64, len: usize) -> usize {
    if offset < 0 {
        len.saturating_sub((-offset) as usize)
    } else {
        (offset as usize).min(len)
    }
}

fn regex_replace(text: &str, pattern: &str, replacement: &str, all: bool, ctx: &mut Context) -> Value {
    match Regex::new(pattern) {
        Ok(re) => {
            let replacement = replacement.replace("\\0", "$0");
            if all {
                Value::String(re.replace_all(text, replacement.as_str()).to_string())
            } else {
                Value::String(re.replace(text, replacement.as_str()).to_string())
            }
        }
        Err(_) => {
            ctx.push_diagnostic(crate::diagnostics::Diagnostic::invalid_regex(pattern));
            Value::String(text.to_string())
        }
    }
}

fn json_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn cstr_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Sort a query string's key/value pairs by key, the way Fastly's
/// `boltsort.sort` normalizes a cache key's querystring component.
fn boltsort(qs: &str) -> String {
    let mut pairs: Vec<&str> = qs.split('&').filter(|p| !p.is_empty()).collect();
    pairs.sort_unstable();
    pairs.join("&")
}

fn subfield(haystack: &str, name: &str, sep: &str) -> Value {
    for part in haystack.split(sep.chars().next().unwrap_or(';')) {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Value::String(value.trim().to_string());
            }
        }
    }
    Value::Null
}

/// Match a status code against a comma-separated spec of exact codes
/// and `a-b` ranges, e.g. `"200,301-303"`.
fn status_matches_spec(status: i64, spec: &str) -> bool {
    spec.split(',').any(|part| {
        let part = part.trim();
        match part.split_once('-') {
            Some((lo, hi)) => match (lo.trim().parse::<i64>(), hi.trim().parse::<i64>()) {
                (Ok(lo), Ok(hi)) => status >= lo && status <= hi,
                _ => false,
            },
            None => part.parse::<i64>() == Ok(status),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substr_supports_negative_offset() {
        let mut ctx = Context::new();
        let result = dispatch("substr", &[Value::string("hello world"), Value::Integer(-5)], &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(result.as_string(), "world");
    }

    #[test]
    fn regsuball_replaces_every_match() {
        let mut ctx = Context::new();
        let result = dispatch(
            "regsuball",
            &[Value::string("a1b2c3"), Value::string("[0-9]"), Value::string("_")],
            &mut ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.as_string(), "a_b_c_");
    }

    #[test]
    fn urlencode_decode_round_trips() {
        let mut ctx = Context::new();
        let encoded = dispatch("urlencode", &[Value::string("a b/c")], &mut ctx).unwrap().unwrap();
        let decoded = dispatch("urldecode", &[encoded], &mut ctx).unwrap().unwrap();
        assert_eq!(decoded.as_string(), "a b/c");
    }

    #[test]
    fn http_status_matches_ranges_and_exact_codes() {
        let mut ctx = Context::new();
        assert!(dispatch("http_status_matches", &[Value::Integer(302), Value::string("200,301-303")], &mut ctx)
            .unwrap()
            .unwrap()
            .as_bool());
        assert!(!dispatch("http_status_matches", &[Value::Integer(404), Value::string("200,301-303")], &mut ctx)
            .unwrap()
            .unwrap()
            .as_bool());
    }

    #[test]
    fn h2_and_h3_functions_are_accepted_and_ignored() {
        let mut ctx = Context::new();
        assert!(dispatch("h2.push", &[], &mut ctx).unwrap().unwrap().as_bool());
        assert!(dispatch("h3.early_data", &[], &mut ctx).unwrap().unwrap().as_bool());
    }
}
