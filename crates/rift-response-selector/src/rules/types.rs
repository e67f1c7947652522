//! Rule configuration types.

use crate::value::comparison_text;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Request location a rule reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleTarget {
    Body,
    BodyRaw,
    Query,
    Params,
    Header,
    Cookie,
    RequestNumber,
}

impl RuleTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTarget::Body => "body",
            RuleTarget::BodyRaw => "bodyRaw",
            RuleTarget::Query => "query",
            RuleTarget::Params => "params",
            RuleTarget::Header => "header",
            RuleTarget::Cookie => "cookie",
            RuleTarget::RequestNumber => "request_number",
        }
    }
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "body" => Ok(RuleTarget::Body),
            "bodyRaw" => Ok(RuleTarget::BodyRaw),
            "query" => Ok(RuleTarget::Query),
            "params" => Ok(RuleTarget::Params),
            "header" => Ok(RuleTarget::Header),
            "cookie" => Ok(RuleTarget::Cookie),
            "request_number" => Ok(RuleTarget::RequestNumber),
            other => Err(format!("unknown rule target: {other}")),
        }
    }
}

/// Comparison applied to the resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    #[default]
    Equals,
    Regex,
    Null,
    EmptyArray,
}

/// How a response combines the results of its rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum RulesOperator {
    #[serde(rename = "AND")]
    And,
    #[default]
    #[serde(rename = "OR")]
    Or,
}

/// A single condition on the incoming request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Rule {
    /// `None` when the configured target is missing or empty; such a rule never matches.
    #[serde(
        default,
        deserialize_with = "deserialize_target",
        serialize_with = "serialize_target"
    )]
    pub target: Option<RuleTarget>,

    /// Path into the target (body/query/params) or a header/cookie name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,

    /// Expected value; `None` compares as the empty string
    #[serde(default, deserialize_with = "deserialize_rule_value")]
    pub value: Option<String>,

    #[serde(default, deserialize_with = "deserialize_operator")]
    pub operator: RuleOperator,
}

impl Rule {
    pub fn new(target: RuleTarget, modifier: Option<&str>, value: &str, operator: RuleOperator) -> Self {
        Self {
            target: Some(target),
            modifier: modifier.map(str::to_string),
            value: Some(value.to_string()),
            operator,
        }
    }

    /// The modifier, if present and non-empty.
    pub fn modifier(&self) -> Option<&str> {
        self.modifier.as_deref().filter(|m| !m.is_empty())
    }
}

fn deserialize_target<'de, D>(deserializer: D) -> Result<Option<RuleTarget>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(D::Error::custom),
    }
}

fn serialize_target<S>(target: &Option<RuleTarget>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(target.map_or("", |t| t.as_str()))
}

/// Rule values may be stored as strings, numbers, booleans or null.
fn deserialize_rule_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => {
            Ok(Some(comparison_text(&serde_json::Value::Number(n)).into_owned()))
        }
        serde_json::Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!(
            "rule value must be a string, number, boolean or null, got {other}"
        ))),
    }
}

/// A null operator means `equals`.
fn deserialize_operator<'de, D>(deserializer: D) -> Result<RuleOperator, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RuleOperator>::deserialize(deserializer)?.unwrap_or_default())
}
