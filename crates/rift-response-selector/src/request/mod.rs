//! Incoming request representation and the per-request snapshot rules read from.
//!
//! ## Module Structure
//!
//! - `body`: content-type detection and structured body parsing
//! - `query`: query-string, form and cookie parsing
//!
//! [`IncomingRequest`] is what the transport layer hands over. [`RequestSnapshot`]
//! is the read-only projection built once per request for rule evaluation.

mod body;
mod query;

pub use body::{parse_body, parse_xml, BodyKind};
pub use query::{parse_cookies, parse_nested_query};

use bytes::Bytes;
use hyper::header::{HeaderName, CONTENT_TYPE, COOKIE};
use hyper::{HeaderMap, Method, Uri};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A request as received by a mock route.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Parsed query string (see [`parse_nested_query`])
    pub query: Value,
    /// Path parameters captured by the route pattern
    pub params: HashMap<String, String>,
}

impl Default for IncomingRequest {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            query: Value::Object(Map::new()),
            params: HashMap::new(),
        }
    }
}

impl IncomingRequest {
    /// Build from hyper request parts.
    pub fn from_parts(
        method: Method,
        uri: &Uri,
        headers: HeaderMap,
        body: Bytes,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            method,
            path: uri.path().to_string(),
            headers,
            body,
            query: parse_nested_query(uri.query().unwrap_or("")),
            params,
        }
    }

    /// Case-insensitive header lookup. Repeated headers are joined with `", "`.
    pub fn header(&self, name: &str) -> Option<String> {
        let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
        let values: Vec<&str> = self
            .headers
            .get_all(&name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    pub fn cookies(&self) -> HashMap<String, String> {
        parse_cookies(
            self.headers
                .get_all(COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        )
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Raw body as text. Invalid UTF-8 is replaced, never rejected.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Snapshot locations addressable with a path modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotTarget {
    Body,
    BodyRaw,
    Query,
    Params,
}

/// Read-only view of one request, built once before response selection.
#[derive(Debug, Clone)]
pub struct RequestSnapshot<'r> {
    request: &'r IncomingRequest,
    body: Value,
    body_raw: Value,
    params: Value,
    cookies: HashMap<String, String>,
}

impl<'r> RequestSnapshot<'r> {
    pub fn new(request: &'r IncomingRequest) -> Self {
        let raw = request.body_text();
        let body = parse_body(request.content_type(), &raw);
        let params = Value::Object(
            request
                .params
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        );

        Self {
            request,
            body,
            body_raw: Value::String(raw),
            params,
            cookies: request.cookies(),
        }
    }

    pub fn target(&self, target: SnapshotTarget) -> &Value {
        match target {
            SnapshotTarget::Body => &self.body,
            SnapshotTarget::BodyRaw => &self.body_raw,
            SnapshotTarget::Query => &self.request.query,
            SnapshotTarget::Params => &self.params,
        }
    }

    pub fn body_raw(&self) -> &Value {
        &self.body_raw
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.request.header(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn request(&self) -> &IncomingRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use serde_json::json;

    fn request_with(content_type: &str, body: &'static str) -> IncomingRequest {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        IncomingRequest {
            method: Method::POST,
            headers,
            body: Bytes::from_static(body.as_bytes()),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_parts_parses_query() {
        let uri: Uri = "/users/7?id=42&tags=a&tags=b".parse().unwrap();
        let params = HashMap::from([("userId".to_string(), "7".to_string())]);
        let request =
            IncomingRequest::from_parts(Method::GET, &uri, HeaderMap::new(), Bytes::new(), params);

        assert_eq!(request.path, "/users/7");
        assert_eq!(request.query, json!({"id": "42", "tags": ["a", "b"]}));
    }

    #[test]
    fn test_deeply_bracketed_query_and_form_degrade() {
        let brackets = "[]".repeat(30_000);
        let uri: Uri = format!("/search?a{brackets}=x&id=1").parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let body = Bytes::from(format!("b{brackets}=y&user=alice"));

        let request =
            IncomingRequest::from_parts(Method::POST, &uri, headers, body, HashMap::new());
        assert_eq!(request.query["id"], json!("1"));
        assert!(request.query["a"].is_array());

        let snapshot = RequestSnapshot::new(&request);
        let form = snapshot.target(SnapshotTarget::Body);
        assert_eq!(form["user"], json!("alice"));
        assert!(form["b"].is_array());
    }

    #[test]
    fn test_snapshot_binds_targets() {
        let mut request = request_with("application/json", r#"{"name":"rift"}"#);
        request.query = json!({"page": "2"});
        request.params.insert("id".to_string(), "9".to_string());
        let snapshot = RequestSnapshot::new(&request);

        assert_eq!(snapshot.target(SnapshotTarget::Body), &json!({"name": "rift"}));
        assert_eq!(
            snapshot.target(SnapshotTarget::BodyRaw),
            &json!(r#"{"name":"rift"}"#)
        );
        assert_eq!(snapshot.target(SnapshotTarget::Query), &json!({"page": "2"}));
        assert_eq!(snapshot.target(SnapshotTarget::Params), &json!({"id": "9"}));
    }

    #[test]
    fn test_snapshot_unrecognized_content_type() {
        let request = request_with("text/plain", "hello");
        let snapshot = RequestSnapshot::new(&request);

        assert_eq!(snapshot.target(SnapshotTarget::Body), &json!({}));
        assert_eq!(snapshot.body_raw(), &json!("hello"));
    }

    #[test]
    fn test_snapshot_binary_body_does_not_fail() {
        let request = IncomingRequest {
            body: Bytes::from_static(&[0xff, 0xfe, b'o', b'k']),
            ..Default::default()
        };
        let snapshot = RequestSnapshot::new(&request);

        let raw = snapshot.body_raw().as_str().unwrap();
        assert!(raw.ends_with("ok"));
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let mut request = IncomingRequest::default();
        request
            .headers
            .append("x-trace", HeaderValue::from_static("one"));
        request
            .headers
            .append("x-trace", HeaderValue::from_static("two"));

        assert_eq!(request.header("X-Trace").as_deref(), Some("one, two"));
        assert_eq!(request.header("x-missing"), None);
        assert_eq!(request.header("bad header"), None);
    }

    #[test]
    fn test_snapshot_cookies() {
        let mut request = IncomingRequest::default();
        request
            .headers
            .insert(COOKIE, HeaderValue::from_static("session=abc; theme=dark"));
        let snapshot = RequestSnapshot::new(&request);

        assert_eq!(snapshot.cookie("session"), Some("abc"));
        assert_eq!(snapshot.cookie("theme"), Some("dark"));
        assert_eq!(snapshot.cookie("other"), None);
    }
}
