//! Modifier paths into snapshot structures.
//!
//! Two forms are supported:
//! - dotted/bracketed paths: `user.name`, `items[0].id`, `items.0.id`,
//!   `headers['x.y']`, `a\.b` (escaped dot inside a key)
//! - JSONPath (RFC 9535) when the modifier starts with `$`: `$.items[*].id`
//!
//! Lookups are total: any traversal failure resolves to `None`.

use serde_json::Value;
use serde_json_path::JsonPath;
use std::borrow::Cow;

/// A compiled modifier path.
#[derive(Debug, Clone)]
pub enum ModifierPath {
    Segments(Vec<String>),
    JsonPath(JsonPath),
    /// JSONPath that failed to parse; never resolves.
    Invalid,
}

impl ModifierPath {
    pub fn compile(modifier: &str) -> Self {
        if modifier.starts_with('$') {
            match JsonPath::parse(modifier) {
                Ok(path) => ModifierPath::JsonPath(path),
                Err(_) => ModifierPath::Invalid,
            }
        } else {
            ModifierPath::Segments(split_path(modifier))
        }
    }

    /// Resolve against `root`. Several JSONPath matches resolve to an array.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<Cow<'a, Value>> {
        match self {
            ModifierPath::Segments(segments) => walk(root, segments).map(Cow::Borrowed),
            ModifierPath::JsonPath(path) => {
                let mut nodes = path.query(root).all();
                match nodes.len() {
                    0 => None,
                    1 => nodes.pop().map(Cow::Borrowed),
                    _ => Some(Cow::Owned(Value::Array(
                        nodes.into_iter().cloned().collect(),
                    ))),
                }
            }
            ModifierPath::Invalid => None,
        }
    }
}

/// Split a dotted/bracketed path into segments.
///
/// `a.b[0]['c.d']` becomes `["a", "b", "0", "c.d"]`.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '.' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                let quote = match chars.peek() {
                    Some(&q @ ('\'' | '"')) => {
                        chars.next();
                        Some(q)
                    }
                    _ => None,
                };
                let mut key = String::new();
                while let Some(inner) = chars.next() {
                    if Some(inner) == quote && chars.peek() == Some(&']') {
                        chars.next();
                        break;
                    }
                    if quote.is_none() && inner == ']' {
                        break;
                    }
                    key.push(inner);
                }
                segments.push(key);
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Walk `segments` from `root`. Numeric segments index arrays; every other
/// segment looks up an object key.
pub fn walk<'a, S: AsRef<str>>(root: &'a Value, segments: &[S]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment.as_ref()),
            Value::Array(items) => segment
                .as_ref()
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        })
}
