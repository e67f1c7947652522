//! Route definitions and their compiled, selection-ready form.

use super::counter::RequestCounter;
use super::select::{select_response, Selection, SelectionMode, SelectionReason};
use crate::error::SelectorError;
use crate::request::{IncomingRequest, RequestSnapshot};
use crate::rules::{CompiledRules, Rule, RulesOperator};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// A response header entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

/// One candidate response of a route. Content fields are carried, not interpreted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub uuid: String,

    #[serde(default)]
    pub label: String,

    #[serde(default = "default_status_code")]
    pub status_code: u16,

    #[serde(default)]
    pub body: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,

    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub rules_operator: RulesOperator,
}

fn default_status_code() -> u16 {
    200
}

/// A mock route and its ordered candidate responses.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub uuid: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub endpoint: String,

    pub responses: Vec<RouteResponse>,

    #[serde(default)]
    pub random_response: bool,

    #[serde(default)]
    pub sequential_response: bool,
}

fn default_method() -> String {
    "get".to_string()
}

impl Route {
    /// Load a route from a YAML or JSON file (chosen by extension).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let route: Route = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };
        route.validate()?;
        Ok(route)
    }

    /// Validate the route definition.
    pub fn validate(&self) -> Result<(), SelectorError> {
        if self.responses.is_empty() {
            return Err(SelectorError::Config(format!(
                "route '{}' has no responses",
                self.uuid
            )));
        }

        if self.random_response && self.sequential_response {
            warn!(
                "Route '{}' enables both randomResponse and sequentialResponse; random takes precedence",
                self.uuid
            );
        }

        Ok(())
    }

    pub fn selection_mode(&self) -> SelectionMode {
        SelectionMode::from_flags(self.random_response, self.sequential_response)
    }
}

/// The response chosen for one request.
#[derive(Debug, Clone, Copy)]
pub struct SelectedResponse<'a> {
    pub response: &'a RouteResponse,
    pub index: usize,
    pub reason: SelectionReason,
    pub request_number: u64,
}

/// A route with every response's rules compiled.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub route: Route,
    pub mode: SelectionMode,
    rules: Vec<CompiledRules>,
}

impl CompiledRoute {
    pub fn compile(route: Route) -> Result<Self, SelectorError> {
        route.validate()?;

        let rules: Vec<CompiledRules> = route
            .responses
            .iter()
            .map(|response| CompiledRules::compile(&response.rules, response.rules_operator))
            .collect();
        let mode = route.selection_mode();

        info!(
            "Compiled route '{}' with {} responses ({:?})",
            route.uuid,
            rules.len(),
            mode
        );

        Ok(Self { route, mode, rules })
    }

    /// Count the request on `counter`, then pick a response for it.
    pub fn select(
        &self,
        request: &IncomingRequest,
        counter: &RequestCounter,
    ) -> Result<SelectedResponse<'_>, SelectorError> {
        let request_number = counter.increment();
        self.select_with_request_number(request, request_number)
    }

    /// Pick a response for a request whose number was already taken from the counter.
    pub fn select_with_request_number(
        &self,
        request: &IncomingRequest,
        request_number: u64,
    ) -> Result<SelectedResponse<'_>, SelectorError> {
        let snapshot = RequestSnapshot::new(request);
        let Selection { index, reason } =
            select_response(&self.rules, self.mode, &snapshot, request_number)?;

        let response = self.route.responses.get(index).ok_or_else(|| {
            SelectorError::InvalidState(format!(
                "selected index {index} out of range for route '{}'",
                self.route.uuid
            ))
        })?;

        debug!(
            "Route '{}' request #{} -> response '{}' ({})",
            self.route.uuid, request_number, response.uuid, reason
        );

        Ok(SelectedResponse {
            response,
            index,
            reason,
            request_number,
        })
    }
}
