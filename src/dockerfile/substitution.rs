//! Placeholder scanning and substitution
//!
//! Recognized forms:
//!
//! - `$NAME`: bare reference, the name runs over `[A-Za-z0-9_]`
//! - `${NAME}`: braced reference
//! - `${NAME:default}` / `${NAME:-default}`: value of `NAME`, or `default` when unset
//! - `${NAME:+alt}`: `alt` when `NAME` is set, empty otherwise
//!
//! A `$` preceded by a backslash is left alone. Substituted values are never
//! re-scanned.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::ops::Range;

/// How a placeholder's default clause is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultMode {
    /// Use the variable's value, falling back to the default when unset
    WhenUnset,
    /// Use the default only when the variable is set, empty otherwise
    WhenSet,
}

/// A placeholder reference as written in an argument string
///
/// Two placeholders are equal when their original text is equal.
#[derive(Debug, Clone)]
pub struct Placeholder {
    pub name: String,
    pub default: Option<String>,
    pub mode: DefaultMode,
    pub text: String,
}

impl Placeholder {
    /// Resolves the placeholder against a name-to-value mapping
    pub fn resolve<'a>(&'a self, vars: &'a HashMap<String, String>) -> &'a str {
        let fallback = self.default.as_deref().unwrap_or("");
        match (self.mode, vars.get(&self.name)) {
            (DefaultMode::WhenUnset, Some(value)) => value.as_str(),
            (DefaultMode::WhenUnset, None) => fallback,
            (DefaultMode::WhenSet, Some(_)) => fallback,
            (DefaultMode::WhenSet, None) => "",
        }
    }
}

impl PartialEq for Placeholder {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Placeholder {}

impl Hash for Placeholder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

/// One placeholder match and the byte range it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub placeholder: Placeholder,
    pub span: Range<usize>,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_name_byte)
}

/// Scans `input` front to back and returns every placeholder occurrence in order
pub fn scan(input: &str) -> Vec<Occurrence> {
    let bytes = input.as_bytes();
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = input[pos..].find('$') {
        let start = pos + offset;
        if start > 0 && bytes[start - 1] == b'\\' {
            pos = start + 1;
            continue;
        }

        match occurrence_at(input, start) {
            Some(occurrence) => {
                pos = occurrence.span.end;
                found.push(occurrence);
            }
            None => pos = start + 1,
        }
    }

    found
}

fn occurrence_at(input: &str, start: usize) -> Option<Occurrence> {
    let rest = &input[start + 1..];

    let (name, default, mode, end) = if let Some(body) = rest.strip_prefix('{') {
        let close = body.find('}')?;
        let inner = &body[..close];
        let end = start + 2 + close + 1;
        match inner.split_once(':') {
            Some((name, clause)) => {
                if let Some(alt) = clause.strip_prefix('+') {
                    (name, Some(alt), DefaultMode::WhenSet, end)
                } else {
                    let default = clause.strip_prefix('-').unwrap_or(clause);
                    (name, Some(default), DefaultMode::WhenUnset, end)
                }
            }
            None => (inner, None, DefaultMode::WhenUnset, end),
        }
    } else {
        let len = rest.bytes().take_while(|b| is_name_byte(*b)).count();
        (&rest[..len], None, DefaultMode::WhenUnset, start + 1 + len)
    };

    if !is_name(name) {
        return None;
    }

    Some(Occurrence {
        placeholder: Placeholder {
            name: name.to_string(),
            default: default.map(str::to_string),
            mode,
            text: input[start..end].to_string(),
        },
        span: start..end,
    })
}

/// Returns `input` with every placeholder occurrence replaced by its resolution
pub fn substitute(input: &str, vars: &HashMap<String, String>) -> String {
    let mut output = String::with_capacity(input.len());
    let mut last = 0;

    for occurrence in scan(input) {
        output.push_str(&input[last..occurrence.span.start]);
        output.push_str(occurrence.placeholder.resolve(vars));
        last = occurrence.span.end;
    }

    output.push_str(&input[last..]);
    output
}
