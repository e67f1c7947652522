//! Query-string, form and cookie parsing.
//!
//! Keys use bracket notation to build nested structures:
//! - `a=1&a=2` - repeated key, `{"a": ["1", "2"]}`
//! - `a[]=1&a[]=2` - explicit array push
//! - `a[b]=1` - nested object, `{"a": {"b": "1"}}`
//! - `a[0]=x&a[1]=y` - indexed array

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Parse a query string or URL-encoded form body into a nested mapping.
///
/// Never fails: pairs without `=` get an empty value, undecodable escapes keep
/// their raw text and malformed bracket keys are used verbatim.
pub fn parse_nested_query(input: &str) -> Value {
    let mut root = Value::Object(Map::new());
    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(raw_key);
        if key.is_empty() {
            continue;
        }
        let segments = key_segments(&key);
        assign(
            &mut root,
            &segments,
            Value::String(decode_component(raw_value)),
        );
    }
    root
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Maximum number of bracket segments turned into nesting levels.
const MAX_DEPTH: usize = 5;

/// Split `a[b][]` into `["a", "b", ""]`. Falls back to the whole key when the
/// brackets are unbalanced. Past [`MAX_DEPTH`] brackets the remainder of the
/// key becomes one literal segment: `a[b][c][d][e][f][g][h]` ends in `"[g][h]"`.
fn key_segments(key: &str) -> Vec<&str> {
    let Some(open) = key.find('[') else {
        return vec![key];
    };
    if open == 0 {
        return vec![key];
    }

    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while !rest.is_empty() {
        if segments.len() > MAX_DEPTH {
            segments.push(rest);
            break;
        }
        let Some(inner) = rest.strip_prefix('[') else {
            return vec![key];
        };
        let Some(close) = inner.find(']') else {
            return vec![key];
        };
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    segments
}

fn is_index(segment: &str) -> bool {
    segment.bytes().all(|b| b.is_ascii_digit())
}

/// Store `value` at the end of `segments`. A `Null` slot is vacant.
fn assign(slot: &mut Value, segments: &[&str], value: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        merge(slot, value);
        return;
    };

    if slot.is_null() {
        *slot = if is_index(segment) {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        };
    }

    match slot {
        Value::Object(map) => {
            let key = if segment.is_empty() {
                map.len().to_string()
            } else {
                (*segment).to_string()
            };
            assign(map.entry(key).or_insert(Value::Null), rest, value);
        }
        Value::Array(items) => {
            if segment.is_empty() {
                let mut child = Value::Null;
                assign(&mut child, rest, value);
                items.push(child);
                return;
            }
            if let Ok(index) = segment.parse::<usize>() {
                if let Some(existing) = items.get_mut(index) {
                    assign(existing, rest, value);
                } else {
                    let mut child = Value::Null;
                    assign(&mut child, rest, value);
                    items.push(child);
                }
                return;
            }
            // Named key on an array: re-key the elements by position.
            let map: Map<String, Value> = items
                .drain(..)
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect();
            *slot = Value::Object(map);
            assign(slot, segments, value);
        }
        _ => {
            let previous = std::mem::take(slot);
            let mut child = Value::Null;
            assign(&mut child, segments, value);
            *slot = Value::Array(vec![previous, child]);
        }
    }
}

fn merge(slot: &mut Value, value: Value) {
    match slot {
        Value::Null => *slot = value,
        Value::Array(items) => items.push(value),
        _ => {
            let previous = std::mem::take(slot);
            *slot = Value::Array(vec![previous, value]);
        }
    }
}

/// Parse `Cookie` header values into a name/value map.
///
/// The first occurrence of a name wins; values are percent-decoded and
/// stripped of surrounding double quotes.
pub fn parse_cookies<'a>(header_values: impl IntoIterator<Item = &'a str>) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for header in header_values {
        for pair in header.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            let decoded = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            cookies.entry(name.to_string()).or_insert(decoded);
        }
    }
    cookies
}
