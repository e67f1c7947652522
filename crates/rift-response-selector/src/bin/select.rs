//! Rift Response Selector CLI Tool
//!
//! Replays a request fixture against a route definition and reports which
//! response the route would serve.
//!
//! Usage:
//!   rift-select --route route.yaml --request request.json [--repeat 3] [--json]
//!
//! Request fixture format:
//!   {
//!     "method": "POST",
//!     "path": "/users/7?verbose=true",
//!     "headers": {"content-type": "application/json"},
//!     "params": {"id": "7"},
//!     "body": {"role": "admin"}
//!   }
//!
//! A string `body` is sent verbatim; any other JSON value is serialized.

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Uri};
use rift_response_selector::{
    CompiledRoute, IncomingRequest, RequestCounter, Route, SelectionReason,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Rift Response Selector - see which response a route serves for a request
#[derive(Parser, Debug)]
#[command(name = "rift-select")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Route definition (YAML or JSON)
    #[arg(short, long)]
    route: PathBuf,

    /// Request fixture (JSON). Defaults to `GET /` with no headers or body.
    #[arg(short = 'q', long)]
    request: Option<PathBuf>,

    /// Replay the request this many times against one counter
    #[arg(short = 'n', long, default_value = "1")]
    repeat: u64,

    /// Print one JSON object per selection instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RequestFixture {
    method: Option<String>,
    path: Option<String>,
    headers: HashMap<String, String>,
    params: HashMap<String, String>,
    body: Option<serde_json::Value>,
}

impl RequestFixture {
    fn load(path: &PathBuf) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading request fixture {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing request fixture {}", path.display()))
    }

    fn into_request(self) -> anyhow::Result<IncomingRequest> {
        let method = self.method.as_deref().unwrap_or("GET").to_uppercase();
        let method = Method::from_bytes(method.as_bytes())
            .with_context(|| format!("invalid method '{method}'"))?;

        let path = self.path.as_deref().unwrap_or("/");
        let uri: Uri = path
            .parse()
            .with_context(|| format!("invalid request path '{path}'"))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name '{name}'"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header '{name}'"))?;
            headers.append(name, value);
        }

        let body = match self.body {
            None => Bytes::new(),
            Some(serde_json::Value::String(s)) => Bytes::from(s),
            Some(other) => Bytes::from(other.to_string()),
        };

        Ok(IncomingRequest::from_parts(
            method,
            &uri,
            headers,
            body,
            self.params,
        ))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rift_response_selector=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let route = Route::from_file(&args.route)
        .with_context(|| format!("loading route {}", args.route.display()))?;
    let fixture = match &args.request {
        Some(path) => RequestFixture::load(path)?,
        None => RequestFixture::default(),
    };
    let request = fixture.into_request()?;
    let compiled = CompiledRoute::compile(route)?;
    let counter = RequestCounter::new();

    if !args.json {
        println!(
            "{BOLD}{CYAN}Route{RESET} {} {} /{} ({:?}, {} responses)",
            compiled.route.uuid,
            compiled.route.method.to_uppercase(),
            compiled.route.endpoint,
            compiled.mode,
            compiled.route.responses.len()
        );
    }

    for _ in 0..args.repeat {
        let selected = compiled.select(&request, &counter)?;

        if args.json {
            println!(
                "{}",
                serde_json::json!({
                    "requestNumber": selected.request_number,
                    "index": selected.index,
                    "uuid": selected.response.uuid,
                    "label": selected.response.label,
                    "statusCode": selected.response.status_code,
                    "reason": selected.reason,
                })
            );
            continue;
        }

        let color = match selected.reason {
            SelectionReason::RuleMatch => GREEN,
            SelectionReason::Fallback => YELLOW,
            SelectionReason::Random | SelectionReason::Sequential => CYAN,
        };
        println!(
            "  #{:<4} -> [{}] {} {}{}{} ({}{}{})",
            selected.request_number,
            selected.index,
            selected.response.uuid,
            BOLD,
            selected.response.label,
            RESET,
            color,
            selected.reason,
            RESET
        );
    }

    Ok(())
}
