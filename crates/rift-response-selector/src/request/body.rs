//! Structured body parsing keyed by content type.
//!
//! Supported:
//! - JSON (`application/json`, any `+json` suffix)
//! - URL-encoded forms (`application/x-www-form-urlencoded`)
//! - XML (`application/xml`, `text/xml`) into a compact element tree
//!
//! Anything else, or a body that fails to parse, yields an empty object.

use super::query::parse_nested_query;
use serde_json::{Map, Value};
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Element};
use sxd_document::parser;
use tracing::debug;

/// Body formats the snapshot knows how to structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
    Xml,
}

impl BodyKind {
    /// Detect the body kind from a `Content-Type` header value.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("application/x-www-form-urlencoded") {
            Some(BodyKind::Form)
        } else if content_type.contains("application/json") || content_type.contains("+json") {
            Some(BodyKind::Json)
        } else if content_type.contains("application/xml") || content_type.contains("text/xml") {
            Some(BodyKind::Xml)
        } else {
            None
        }
    }
}

/// Parse `raw` according to `content_type`.
pub fn parse_body(content_type: Option<&str>, raw: &str) -> Value {
    let Some(kind) = content_type.and_then(BodyKind::from_content_type) else {
        return empty_body();
    };

    let parsed = match kind {
        BodyKind::Json => serde_json::from_str(raw).ok(),
        BodyKind::Form => Some(parse_nested_query(raw)),
        BodyKind::Xml => parse_xml(raw),
    };

    parsed.unwrap_or_else(|| {
        debug!("Failed to parse {:?} request body, using empty body", kind);
        empty_body()
    })
}

fn empty_body() -> Value {
    Value::Object(Map::new())
}

const TEXT_KEY: &str = "_text";
const ATTRIBUTES_KEY: &str = "_attributes";

/// Parse XML into the compact form: `<a x="1"><b>t</b><b>u</b></a>` becomes
/// `{"a": {"_attributes": {"x": "1"}, "b": [{"_text": "t"}, {"_text": "u"}]}}`.
pub fn parse_xml(raw: &str) -> Option<Value> {
    let package = parser::parse(raw).ok()?;
    let document = package.as_document();

    let mut root = Map::new();
    for child in document.root().children() {
        if let ChildOfRoot::Element(element) = child {
            insert_child(&mut root, element.name().local_part(), element_value(element));
        }
    }
    Some(Value::Object(root))
}

fn element_value(element: Element<'_>) -> Value {
    let mut node = Map::new();

    let attributes: Map<String, Value> = element
        .attributes()
        .iter()
        .map(|attr| {
            (
                attr.name().local_part().to_string(),
                Value::String(attr.value().to_string()),
            )
        })
        .collect();
    if !attributes.is_empty() {
        node.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
    }

    for child in element.children() {
        match child {
            ChildOfElement::Element(inner) => {
                insert_child(&mut node, inner.name().local_part(), element_value(inner));
            }
            ChildOfElement::Text(text) => {
                if !text.text().trim().is_empty() {
                    insert_child(&mut node, TEXT_KEY, Value::String(text.text().to_string()));
                }
            }
            _ => {}
        }
    }

    Value::Object(node)
}

/// Repeated siblings collapse into an array.
fn insert_child(node: &mut Map<String, Value>, name: &str, value: Value) {
    match node.get_mut(name) {
        None => {
            node.insert(name.to_string(), value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
    }
}
