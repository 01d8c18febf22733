//! Key/value text format for module descriptors and the wiring file.
//!
//! ```text
//! # comment            ! also a comment
//! name = examples
//! implements = skin, layout
//! requires = skin
//! long = first part \
//!        second part
//! ```
//!
//! Keys and values are separated by the first unescaped `=`, `:` or
//! whitespace. A key repeated on several lines accumulates values; comma lists
//! are split by [`Properties::get_list`].

use std::collections::BTreeMap;
use std::path::Path;

/// Multi-valued string properties, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: BTreeMap<String, Vec<String>>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties text. Malformed lines degrade to keys with empty values.
    pub fn parse(text: &str) -> Self {
        let mut properties = Self::new();
        let mut logical = String::new();

        for line in text.lines() {
            let line = line.trim_start();
            if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
                continue;
            }

            if ends_with_continuation(line) {
                logical.push_str(&line[..line.len() - 1]);
                continue;
            }
            logical.push_str(line);

            let (key, value) = split_entry(&logical);
            if !key.is_empty() {
                properties.add(key, value);
            }
            logical.clear();
        }

        if !logical.is_empty() {
            let (key, value) = split_entry(&logical);
            if !key.is_empty() {
                properties.add(key, value);
            }
        }

        properties
    }

    /// Read and parse a properties file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// Every raw value recorded for `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All values of `key`, comma-split, trimmed, empties dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get_all(key)
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Replace every value of `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), vec![value.into()]);
    }

    /// Append a value to `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    pub(crate) fn set_all(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.values.insert(key.into(), values);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Keys starting with `prefix.`, with the prefix stripped, and their first value.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.values.iter().filter_map(move |(key, values)| {
            let rest = key.strip_prefix(prefix)?.strip_prefix('.')?;
            Some((rest, values.first()?.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn ends_with_continuation(line: &str) -> bool {
    let backslashes = line.bytes().rev().take_while(|b| *b == b'\\').count();
    backslashes % 2 == 1
}

fn split_entry(line: &str) -> (String, String) {
    let mut key = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    push_escaped(&mut key, escaped, &mut chars);
                }
            }
            '=' | ':' => break,
            c if c.is_whitespace() => {
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                if chars.peek().is_some_and(|c| *c == '=' || *c == ':') {
                    chars.next();
                }
                break;
            }
            c => key.push(c),
        }
    }

    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }

    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                push_escaped(&mut value, escaped, &mut chars);
            }
        } else {
            value.push(c);
        }
    }

    (key, value.trim_end().to_string())
}

fn push_escaped(out: &mut String, escaped: char, rest: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    match escaped {
        't' => out.push('\t'),
        'n' => out.push('\n'),
        'r' => out.push('\r'),
        'f' => out.push('\u{000c}'),
        'u' => {
            let hex: String = rest.by_ref().take(4).collect();
            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                Some(c) => out.push(c),
                None => {
                    out.push('u');
                    out.push_str(&hex);
                }
            }
        }
        other => out.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_entries() {
        let p = Properties::parse(
            "# comment\n! other comment\n\nname = examples\nextends:base\nmain /\nempty=\n",
        );
        assert_eq!(p.get("name"), Some("examples"));
        assert_eq!(p.get("extends"), Some("base"));
        assert_eq!(p.get("main"), Some("/"));
        assert_eq!(p.get("empty"), Some(""));
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn test_mount_point_values_keep_inner_spaces() {
        let p = Properties::parse("blog = /blog/ [foo]\n");
        assert_eq!(p.get("blog"), Some("/blog/ [foo]"));
    }

    #[test]
    fn test_lists_and_repeats() {
        let p = Properties::parse("requires = a, b ,,c\nrequires = d\n");
        assert_eq!(p.get_list("requires"), vec!["a", "b", "c", "d"]);
        assert_eq!(p.get("requires"), Some("a, b ,,c"));
        assert!(p.get_list("missing").is_empty());
    }

    #[test]
    fn test_continuation_and_escapes() {
        let p = Properties::parse("long = one \\\n   two\nkey\\ with\\spaces = x\\ty\nuni = \\u0041\n");
        assert_eq!(p.get("long"), Some("one two"));
        assert_eq!(p.get("key withspaces"), Some("x\ty"));
        assert_eq!(p.get("uni"), Some("A"));

        // An escaped backslash at the end is not a continuation.
        let p = Properties::parse("path = c:\\\\\nnext = 1\n");
        assert_eq!(p.get("path"), Some("c:\\"));
        assert_eq!(p.get("next"), Some("1"));
    }

    #[test]
    fn test_prefixed_keys() {
        let p = Properties::parse("zone.root = /main/\nzone.foo = http://foo.com/\nzoned = x\n");
        let zones: Vec<_> = p.with_prefix("zone").collect();
        assert_eq!(zones, vec![("foo", "http://foo.com/"), ("root", "/main/")]);
    }
}
