//! Case-insensitive, case-preserving, insertion-ordered header map.
//!
//! Keyed by the lowercased header name with a side table preserving
//! the original case of the most recent write, plus an insertion-order
//! vector for iteration (`header.filter`/`filter_except` need stable
//! ordering).

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    order: Vec<String>,
    entries: HashMap<String, (String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, v)| v.as_str())
    }

    /// Overwrite the header value, preserving the casing of this write.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let key = name.to_ascii_lowercase();
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, (name.to_string(), value.into()));
    }

    /// Append to an existing value; separator is newline for
    /// `set-cookie`, comma-space for everything else. Acts as `set`
    /// when the header is absent.
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let key = name.to_ascii_lowercase();
        if let Some((display, existing)) = self.entries.get_mut(&key) {
            let sep = if key == "set-cookie" { "\n" } else { ", " };
            *existing = format!("{existing}{sep}{value}");
            *display = name.to_string();
        } else {
            self.set(name, value);
        }
    }

    /// Delete a header. `name` may carry a trailing `*` wildcard,
    /// matched case-insensitively against the namespace.
    pub fn unset(&mut self, name: &str) {
        if let Some(prefix) = name.strip_suffix('*') {
            let prefix = prefix.to_ascii_lowercase();
            let doomed: Vec<String> = self
                .order
                .iter()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();
            for key in doomed {
                self.entries.remove(&key);
                self.order.retain(|k| k != &key);
            }
        } else {
            let key = name.to_ascii_lowercase();
            if self.entries.remove(&key).is_some() {
                self.order.retain(|k| k != &key);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterate headers in insertion order as (display-name, value).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order.iter().filter_map(move |key| {
            self.entries
                .get(key)
                .map(|(display, value)| (display.as_str(), value.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.set("X-Foo", "bar");
        assert_eq!(headers.get("x-foo"), Some("bar"));
        assert_eq!(headers.get("X-FOO"), Some("bar"));
    }

    #[test]
    fn assignment_preserves_last_written_casing() {
        let mut headers = HeaderMap::new();
        headers.set("X-Foo", "1");
        headers.set("x-foo", "2");
        let (display, value) = headers.iter().next().unwrap();
        assert_eq!(display, "x-foo");
        assert_eq!(value, "2");
    }

    #[test]
    fn add_joins_with_comma_space_except_set_cookie() {
        let mut headers = HeaderMap::new();
        headers.add("Accept", "text/html");
        headers.add("Accept", "application/json");
        assert_eq!(headers.get("accept"), Some("text/html, application/json"));

        headers.add("Set-Cookie", "a=1");
        headers.add("Set-Cookie", "b=2");
        assert_eq!(headers.get("set-cookie"), Some("a=1\nb=2"));
    }

    #[test]
    fn unset_supports_trailing_wildcard() {
        let mut headers = HeaderMap::new();
        headers.set("X-Debug-A", "1");
        headers.set("X-Debug-B", "2");
        headers.set("X-Keep", "3");
        headers.unset("X-Debug-*");
        assert!(headers.get("x-debug-a").is_none());
        assert!(headers.get("x-debug-b").is_none());
        assert_eq!(headers.get("x-keep"), Some("3"));
    }

    #[test]
    fn unset_missing_header_is_noop() {
        let mut headers = HeaderMap::new();
        headers.unset("X-Nope");
        assert!(headers.is_empty());
    }
}
