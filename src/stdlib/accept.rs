//! `accept.*`: RFC 7231 content-negotiation header matching against a
//! server-provided candidate list, honoring `q=` weights.

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

struct Weighted<'a> {
    token: &'a str,
    q: f64,
}

fn parse_weighted(header: &str) -> Vec<Weighted<'_>> {
    let mut items: Vec<Weighted> = header
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let mut q = 1.0;
            let token = match part.split_once(';') {
                Some((tok, params)) => {
                    for param in params.split(';') {
                        let param = param.trim();
                        if let Some(value) = param.strip_prefix("q=") {
                            q = value.trim().parse().unwrap_or(1.0);
                        }
                    }
                    tok.trim()
                }
                None => part,
            };
            Some(Weighted { token, q })
        })
        .collect();
    items.sort_by(|a, b| b.q.partial_cmp(&a.q).unwrap_or(std::cmp::Ordering::Equal));
    items
}

fn token_matches(pattern: &str, candidate: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.split_once('/') {
        Some((type_part, sub_part)) => match candidate.split_once('/') {
            Some((ctype, csub)) => {
                (type_part == "*" || type_part.eq_ignore_ascii_case(ctype))
                    && (sub_part == "*" || sub_part.eq_ignore_ascii_case(csub))
            }
            None => false,
        },
        None => pattern.eq_ignore_ascii_case(candidate),
    }
}

fn lookup(header: &str, candidates: &[String]) -> Option<String> {
    for weighted in parse_weighted(header) {
        if weighted.q <= 0.0 {
            continue;
        }
        for candidate in candidates {
            if token_matches(weighted.token, candidate) {
                return Some(candidate.clone());
            }
        }
    }
    candidates.first().cloned()
}

pub fn dispatch(func: &str, args: &[Value], _ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let header = args.first().map(Value::as_string).unwrap_or_default();
    let candidates: Vec<String> = args[1.min(args.len())..].iter().map(Value::as_string).collect();

    let v = match func {
        "language_lookup" | "charset_lookup" | "encoding_lookup" | "media_lookup" => {
            lookup(&header, &candidates).map(Value::String).unwrap_or(Value::Null)
        }
        "language_filter_basic" => {
            let accepted: Vec<String> = parse_weighted(&header)
                .into_iter()
                .filter(|w| w.q > 0.0)
                .map(|w| w.token.to_string())
                .collect();
            Value::String(accepted.join(", "))
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_lookup_honors_quality_order() {
        let mut ctx = Context::new();
        let result = dispatch(
            "language_lookup",
            &[
                Value::string("fr;q=0.8, en;q=0.9"),
                Value::string("fr"),
                Value::string("en"),
            ],
            &mut ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.as_string(), "en");
    }

    #[test]
    fn media_lookup_matches_wildcard_subtype() {
        let mut ctx = Context::new();
        let result = dispatch(
            "media_lookup",
            &[Value::string("text/*"), Value::string("text/html")],
            &mut ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.as_string(), "text/html");
    }
}
