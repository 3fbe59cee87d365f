//! `querystring.*`: parse, mutate and filter a URL's query string as
//! an ordered list of key/value pairs.

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

fn parse(qs: &str) -> Vec<(String, String)> {
    if qs.is_empty() {
        return Vec::new();
    }
    qs.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn serialize(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| if v.is_empty() { k.clone() } else { format!("{k}={v}") })
        .collect::<Vec<_>>()
        .join("&")
}

fn split_url(url: &str) -> (String, String) {
    match url.split_once('?') {
        Some((path, qs)) => (path.to_string(), qs.to_string()),
        None => (url.to_string(), String::new()),
    }
}

pub fn dispatch(func: &str, args: &[Value], _ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let url = args.first().map(Value::as_string).unwrap_or_default();
    let (path, qs) = split_url(&url);
    let mut pairs = parse(&qs);

    let v = match func {
        "get" => {
            let key = args.get(1).map(Value::as_string).unwrap_or_default();
            return Ok(Some(
                pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| Value::String(v.clone()))
                    .unwrap_or(Value::Null),
            ));
        }
        "set" => {
            let key = args.get(1).map(Value::as_string).unwrap_or_default();
            let value = args.get(2).map(Value::as_string).unwrap_or_default();
            if let Some(entry) = pairs.iter_mut().find(|(k, _)| *k == key) {
                entry.1 = value;
            } else {
                pairs.push((key, value));
            }
            rebuild(&path, &pairs)
        }
        "add" => {
            let key = args.get(1).map(Value::as_string).unwrap_or_default();
            let value = args.get(2).map(Value::as_string).unwrap_or_default();
            pairs.push((key, value));
            rebuild(&path, &pairs)
        }
        "remove" => {
            let key = args.get(1).map(Value::as_string).unwrap_or_default();
            pairs.retain(|(k, _)| *k != key);
            rebuild(&path, &pairs)
        }
        "clean" => rebuild(&path, &pairs),
        "filter" => {
            let keep: Vec<String> = args[1..].iter().map(Value::as_string).collect();
            pairs.retain(|(k, _)| !keep.contains(k));
            rebuild(&path, &pairs)
        }
        "filter_except" => {
            let keep: Vec<String> = args[1..].iter().map(Value::as_string).collect();
            pairs.retain(|(k, _)| keep.contains(k));
            rebuild(&path, &pairs)
        }
        "filtersep" => Value::String(qs),
        "sort" => {
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            rebuild(&path, &pairs)
        }
        "globfilter" => {
            let pattern = args.get(1).map(Value::as_string).unwrap_or_default();
            pairs.retain(|(k, _)| !glob_match(&pattern, k));
            rebuild(&path, &pairs)
        }
        "globfilter_except" => {
            let pattern = args.get(1).map(Value::as_string).unwrap_or_default();
            pairs.retain(|(k, _)| glob_match(&pattern, k));
            rebuild(&path, &pairs)
        }
        "regfilter" => {
            let pattern = args.get(1).map(Value::as_string).unwrap_or_default();
            match regex::Regex::new(&pattern) {
                Ok(re) => pairs.retain(|(k, _)| !re.is_match(k)),
                Err(_) => return Ok(Some(Value::String(url))),
            }
            rebuild(&path, &pairs)
        }
        "regfilter_except" => {
            let pattern = args.get(1).map(Value::as_string).unwrap_or_default();
            match regex::Regex::new(&pattern) {
                Ok(re) => pairs.retain(|(k, _)| re.is_match(k)),
                Err(_) => return Ok(Some(Value::String(url))),
            }
            rebuild(&path, &pairs)
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}

fn rebuild(path: &str, pairs: &[(String, String)]) -> Value {
    let qs = serialize(pairs);
    if qs.is_empty() {
        Value::String(path.to_string())
    } else {
        Value::String(format!("{path}?{qs}"))
    }
}

/// Minimal `*`-only glob, sufficient for query-key filtering.
fn glob_match(pattern: &str, text: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == text,
        Some((prefix, suffix)) => text.starts_with(prefix) && text.ends_with(suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_adds_or_replaces_key() {
        let mut ctx = Context::new();
        let result = dispatch(
            "set",
            &[Value::string("/x?a=1"), Value::string("a"), Value::string("2")],
            &mut ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.as_string(), "/x?a=2");
    }

    #[test]
    fn sort_is_idempotent() {
        let mut ctx = Context::new();
        let once = dispatch("sort", &[Value::string("/x?b=2&a=1")], &mut ctx).unwrap().unwrap();
        let twice = dispatch("sort", &[once.clone()], &mut ctx).unwrap().unwrap();
        assert_eq!(once.as_string(), twice.as_string());
        assert_eq!(once.as_string(), "/x?a=1&b=2");
    }

    #[test]
    fn filter_except_keeps_only_named_keys() {
        let mut ctx = Context::new();
        let result = dispatch(
            "filter_except",
            &[Value::string("/x?a=1&b=2&c=3"), Value::string("b")],
            &mut ctx,
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.as_string(), "/x?b=2");
    }
}
