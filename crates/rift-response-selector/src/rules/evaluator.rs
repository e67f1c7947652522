//! Rule evaluation against a request snapshot.
//!
//! Value resolution, in order:
//! 1. `request_number` - the route's request counter
//! 2. `cookie` - named cookie (a missing name makes the rule invalid)
//! 3. `header` - named header, case-insensitive
//! 4. `body` / `bodyRaw` / `query` / `params` - modifier path into the snapshot;
//!    `body` without a modifier is the raw body text
//!
//! Operators then apply to the resolved value; see [`CompiledRule::matches`].

use super::path::ModifierPath;
use super::types::{Rule, RuleOperator, RuleTarget, RulesOperator};
use crate::request::{RequestSnapshot, SnapshotTarget};
use crate::value::{comparison_text, is_empty_array, is_nullish};
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{trace, warn};

/// Compiled pattern for `regex` rules.
#[derive(Debug, Clone)]
pub enum RulePattern {
    Valid(Arc<Regex>),
    /// Pattern failed to compile; the rule never matches.
    Invalid,
}

/// A rule ready for evaluation: modifier path and regex compiled once.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    path: Option<ModifierPath>,
    pattern: Option<RulePattern>,
}

impl CompiledRule {
    pub fn compile(rule: &Rule) -> Self {
        let path = rule.modifier().map(ModifierPath::compile);

        let pattern = (rule.operator == RuleOperator::Regex).then(|| {
            let source = rule.value.as_deref().unwrap_or("");
            match Regex::new(source) {
                Ok(regex) => RulePattern::Valid(Arc::new(regex)),
                Err(e) => {
                    warn!("Invalid regex '{}' in rule on {:?}: {}", source, rule.target, e);
                    RulePattern::Invalid
                }
            }
        });

        Self {
            rule: rule.clone(),
            path,
            pattern,
        }
    }

    /// Check whether this rule is satisfied for the request.
    pub fn matches(&self, snapshot: &RequestSnapshot<'_>, request_number: u64) -> bool {
        let Some(target) = self.rule.target else {
            return false;
        };
        if target == RuleTarget::Cookie && self.rule.modifier().is_none() {
            return false;
        }

        let resolved = self.resolve(target, snapshot, request_number);
        let result = self.apply_operator(resolved.as_deref());
        trace!(
            rule_target = %target,
            modifier = ?self.rule.modifier(),
            operator = ?self.rule.operator,
            result,
            "Evaluated rule"
        );
        result
    }

    fn resolve<'s>(
        &self,
        target: RuleTarget,
        snapshot: &'s RequestSnapshot<'_>,
        request_number: u64,
    ) -> Option<Cow<'s, Value>> {
        let modifier = self.rule.modifier();
        match target {
            RuleTarget::RequestNumber => Some(Cow::Owned(Value::from(request_number))),
            RuleTarget::Cookie => modifier
                .and_then(|name| snapshot.cookie(name))
                .map(|v| Cow::Owned(Value::String(v.to_string()))),
            RuleTarget::Header => modifier
                .and_then(|name| snapshot.header(name))
                .map(|v| Cow::Owned(Value::String(v))),
            RuleTarget::Body | RuleTarget::BodyRaw | RuleTarget::Query | RuleTarget::Params => {
                let location = match target {
                    RuleTarget::Body => SnapshotTarget::Body,
                    RuleTarget::BodyRaw => SnapshotTarget::BodyRaw,
                    RuleTarget::Query => SnapshotTarget::Query,
                    _ => SnapshotTarget::Params,
                };
                match &self.path {
                    Some(path) => path.resolve(snapshot.target(location)),
                    None if target == RuleTarget::Body => {
                        Some(Cow::Borrowed(snapshot.body_raw()))
                    }
                    None => None,
                }
            }
        }
    }

    fn apply_operator(&self, resolved: Option<&Value>) -> bool {
        match self.rule.operator {
            RuleOperator::Null => self.rule.modifier().is_some() && is_nullish(resolved),
            RuleOperator::EmptyArray => {
                self.rule.modifier().is_some() && is_empty_array(resolved)
            }
            RuleOperator::Regex => {
                let Some(value) = resolved else {
                    return false;
                };
                match &self.pattern {
                    Some(RulePattern::Valid(regex)) => match value {
                        Value::Array(items) => items
                            .iter()
                            .any(|item| regex.is_match(&comparison_text(item))),
                        _ => regex.is_match(&comparison_text(value)),
                    },
                    _ => false,
                }
            }
            RuleOperator::Equals => {
                let Some(value) = resolved else {
                    return false;
                };
                let expected = self.rule.value.as_deref().unwrap_or("");
                match value {
                    Value::Array(items) => items
                        .iter()
                        .any(|item| comparison_text(item) == expected),
                    _ => comparison_text(value) == expected,
                }
            }
        }
    }
}

/// The compiled rule set of one response plus its combinator.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    pub operator: RulesOperator,
    pub rules: Vec<CompiledRule>,
}

impl CompiledRules {
    pub fn compile(rules: &[Rule], operator: RulesOperator) -> Self {
        Self {
            operator,
            rules: rules.iter().map(CompiledRule::compile).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Combine per-rule results. An empty rule set never matches.
    pub fn matches(&self, snapshot: &RequestSnapshot<'_>, request_number: u64) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        match self.operator {
            RulesOperator::And => self
                .rules
                .iter()
                .all(|rule| rule.matches(snapshot, request_number)),
            RulesOperator::Or => self
                .rules
                .iter()
                .any(|rule| rule.matches(snapshot, request_number)),
        }
    }
}

/// Evaluate a single uncompiled rule.
pub fn evaluate_rule(rule: &Rule, snapshot: &RequestSnapshot<'_>, request_number: u64) -> bool {
    CompiledRule::compile(rule).matches(snapshot, request_number)
}

/// Evaluate an uncompiled rule set with its combinator.
pub fn evaluate_rules(
    rules: &[Rule],
    operator: RulesOperator,
    snapshot: &RequestSnapshot<'_>,
    request_number: u64,
) -> bool {
    CompiledRules::compile(rules, operator).matches(snapshot, request_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::IncomingRequest;
    use bytes::Bytes;
    use hyper::header::{HeaderValue, CONTENT_TYPE, COOKIE};
    use serde_json::json;
    use tracing_test::traced_test;

    fn json_request(body: &'static str) -> IncomingRequest {
        let mut request = IncomingRequest::default();
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request.body = Bytes::from_static(body.as_bytes());
        request
    }

    fn rule(target: RuleTarget, modifier: Option<&str>, value: &str, op: RuleOperator) -> Rule {
        Rule::new(target, modifier, value, op)
    }

    fn check(rule: &Rule, request: &IncomingRequest) -> bool {
        evaluate_rule(rule, &RequestSnapshot::new(request), 1)
    }

    #[test]
    fn test_missing_target_never_matches() {
        let request = json_request(r#"{"a":"1"}"#);
        let rule = Rule {
            target: None,
            modifier: Some("a".to_string()),
            value: Some("1".to_string()),
            operator: RuleOperator::Equals,
        };
        assert!(!check(&rule, &request));
    }

    #[test]
    fn test_query_equals() {
        let mut request = IncomingRequest::default();
        request.query = json!({"id": "42"});
        let r = rule(RuleTarget::Query, Some("id"), "42", RuleOperator::Equals);
        assert!(check(&r, &request));

        request.query = json!({"id": "43"});
        assert!(!check(&r, &request));
    }

    #[test]
    fn test_equals_stringifies_numbers_and_bools() {
        let request = json_request(r#"{"count": 5, "active": true, "price": 10.0}"#);
        assert!(check(
            &rule(RuleTarget::Body, Some("count"), "5", RuleOperator::Equals),
            &request
        ));
        assert!(check(
            &rule(RuleTarget::Body, Some("active"), "true", RuleOperator::Equals),
            &request
        ));
        assert!(check(
            &rule(RuleTarget::Body, Some("price"), "10", RuleOperator::Equals),
            &request
        ));
    }

    #[test]
    fn test_equals_array_membership() {
        let request = json_request(r#"{"tags": ["red", "blue", 3]}"#);
        assert!(check(
            &rule(RuleTarget::Body, Some("tags"), "blue", RuleOperator::Equals),
            &request
        ));
        assert!(check(
            &rule(RuleTarget::Body, Some("tags"), "3", RuleOperator::Equals),
            &request
        ));
        assert!(!check(
            &rule(RuleTarget::Body, Some("tags"), "green", RuleOperator::Equals),
            &request
        ));
    }

    #[test]
    fn test_absent_value_never_equals() {
        let request = json_request(r#"{"a": 1}"#);
        assert!(!check(
            &rule(RuleTarget::Body, Some("missing"), "", RuleOperator::Equals),
            &request
        ));
        assert!(!check(
            &rule(RuleTarget::Body, Some("missing"), ".*", RuleOperator::Regex),
            &request
        ));
    }

    #[test]
    fn test_null_values_compare_as_empty_string() {
        let request = json_request(r#"{"a": null}"#);
        let mut r = rule(RuleTarget::Body, Some("a"), "", RuleOperator::Equals);
        assert!(check(&r, &request));

        r.value = None;
        assert!(check(&r, &request));

        let request = json_request(r#"{"a": ""}"#);
        assert!(check(&r, &request));
    }

    #[test]
    fn test_regex_on_body_field() {
        let r = rule(
            RuleTarget::Body,
            Some("email"),
            r"^.+@example\.com$",
            RuleOperator::Regex,
        );
        assert!(check(&r, &json_request(r#"{"email":"a@example.com"}"#)));
        assert!(!check(&r, &json_request(r#"{"email":"a@other.com"}"#)));
    }

    #[test]
    fn test_regex_matches_any_array_element() {
        let r = rule(RuleTarget::Body, Some("ids"), r"^\d{3}$", RuleOperator::Regex);
        assert!(check(&r, &json_request(r#"{"ids": ["x", 123]}"#)));
        assert!(!check(&r, &json_request(r#"{"ids": ["x", 12]}"#)));
    }

    #[test]
    fn test_invalid_regex_fails_only_that_rule() {
        let request = json_request(r#"{"name": "rift"}"#);
        let broken = rule(RuleTarget::Body, Some("name"), "(unclosed", RuleOperator::Regex);
        let fine = rule(RuleTarget::Body, Some("name"), "rift", RuleOperator::Equals);

        assert!(!check(&broken, &request));
        let snapshot = RequestSnapshot::new(&request);
        assert!(evaluate_rules(
            &[broken.clone(), fine.clone()],
            RulesOperator::Or,
            &snapshot,
            1
        ));
        assert!(!evaluate_rules(&[broken, fine], RulesOperator::And, &snapshot, 1));
    }

    #[test]
    #[traced_test]
    fn test_invalid_regex_logged_at_compile() {
        let compiled = CompiledRule::compile(&rule(
            RuleTarget::Query,
            Some("q"),
            "[a-",
            RuleOperator::Regex,
        ));
        assert!(matches!(compiled.pattern, Some(RulePattern::Invalid)));
        assert!(logs_contain("Invalid regex"));
    }

    #[test]
    fn test_null_operator() {
        let mut request = IncomingRequest::default();
        let r = rule(RuleTarget::Params, Some("missing"), "", RuleOperator::Null);
        assert!(check(&r, &request));

        request
            .params
            .insert("missing".to_string(), "null".to_string());
        assert!(!check(&r, &request));

        let body_rule = rule(RuleTarget::Body, Some("value"), "", RuleOperator::Null);
        assert!(check(&body_rule, &json_request(r#"{"value": null}"#)));
        assert!(!check(&body_rule, &json_request(r#"{"value": 0}"#)));
    }

    #[test]
    fn test_null_and_empty_array_require_modifier() {
        let request = json_request(r#"{}"#);
        assert!(!check(
            &rule(RuleTarget::Body, None, "", RuleOperator::Null),
            &request
        ));
        assert!(!check(
            &rule(RuleTarget::Body, Some(""), "", RuleOperator::Null),
            &request
        ));
        assert!(!check(
            &rule(RuleTarget::Body, None, "", RuleOperator::EmptyArray),
            &json_request("[]")
        ));
    }

    #[test]
    fn test_empty_array_operator() {
        let r = rule(RuleTarget::Body, Some("items"), "", RuleOperator::EmptyArray);
        assert!(check(&r, &json_request(r#"{"items": []}"#)));
        assert!(!check(&r, &json_request(r#"{"items": [1]}"#)));
        assert!(!check(&r, &json_request(r#"{"items": "x"}"#)));
        assert!(!check(&r, &json_request(r#"{}"#)));
    }

    #[test]
    fn test_body_without_modifier_uses_raw_text() {
        let mut request = IncomingRequest::default();
        request.body = Bytes::from_static(b"ping");
        assert!(check(
            &rule(RuleTarget::Body, None, "ping", RuleOperator::Equals),
            &request
        ));
        assert!(check(
            &rule(RuleTarget::Body, None, "^pi", RuleOperator::Regex),
            &request
        ));
    }

    #[test]
    fn test_other_targets_without_modifier_are_absent() {
        let mut request = IncomingRequest::default();
        request.query = json!({"": "x"});
        request.body = Bytes::from_static(b"raw");
        assert!(!check(
            &rule(RuleTarget::Query, None, "", RuleOperator::Equals),
            &request
        ));
        assert!(!check(
            &rule(RuleTarget::BodyRaw, None, "raw", RuleOperator::Equals),
            &request
        ));
        assert!(!check(
            &rule(RuleTarget::Params, None, "", RuleOperator::Regex),
            &request
        ));
    }

    #[test]
    fn test_header_target() {
        let mut request = IncomingRequest::default();
        request
            .headers
            .insert("x-api-key", HeaderValue::from_static("secret"));
        assert!(check(
            &rule(RuleTarget::Header, Some("X-API-KEY"), "secret", RuleOperator::Equals),
            &request
        ));
        assert!(!check(
            &rule(RuleTarget::Header, Some("x-other"), "", RuleOperator::Equals),
            &request
        ));
        assert!(check(
            &rule(RuleTarget::Header, Some("x-other"), "", RuleOperator::Null),
            &request
        ));
    }

    #[test]
    fn test_cookie_target() {
        let mut request = IncomingRequest::default();
        request
            .headers
            .insert(COOKIE, HeaderValue::from_static("session=abc"));
        assert!(check(
            &rule(RuleTarget::Cookie, Some("session"), "abc", RuleOperator::Equals),
            &request
        ));
        assert!(!check(
            &rule(RuleTarget::Cookie, None, "abc", RuleOperator::Equals),
            &request
        ));
        assert!(!check(
            &rule(RuleTarget::Cookie, Some("other"), "abc", RuleOperator::Equals),
            &request
        ));
    }

    #[test]
    fn test_request_number_target() {
        let request = IncomingRequest::default();
        let snapshot = RequestSnapshot::new(&request);
        let r = rule(RuleTarget::RequestNumber, None, "3", RuleOperator::Equals);
        assert!(!evaluate_rule(&r, &snapshot, 2));
        assert!(evaluate_rule(&r, &snapshot, 3));

        let even = rule(RuleTarget::RequestNumber, None, r"^\d*[02468]$", RuleOperator::Regex);
        assert!(evaluate_rule(&even, &snapshot, 10));
        assert!(!evaluate_rule(&even, &snapshot, 11));
    }

    #[test]
    fn test_jsonpath_modifier() {
        let request = json_request(r#"{"orders": [{"status": "open"}, {"status": "paid"}]}"#);
        assert!(check(
            &rule(
                RuleTarget::Body,
                Some("$.orders[*].status"),
                "paid",
                RuleOperator::Equals
            ),
            &request
        ));
        assert!(check(
            &rule(
                RuleTarget::Body,
                Some("$.orders[?@.status == 'open']"),
                "",
                RuleOperator::Null
            ),
            &json_request(r#"{"orders": []}"#)
        ));
    }

    #[test]
    fn test_compiled_rules_empty_never_match() {
        let request = IncomingRequest::default();
        let snapshot = RequestSnapshot::new(&request);
        assert!(!CompiledRules::compile(&[], RulesOperator::Or).matches(&snapshot, 1));
        assert!(!CompiledRules::compile(&[], RulesOperator::And).matches(&snapshot, 1));
    }

    #[test]
    fn test_and_or_combination() {
        let mut request = IncomingRequest::default();
        request.query = json!({"a": "1", "b": "2"});
        let snapshot = RequestSnapshot::new(&request);
        let rules = vec![
            rule(RuleTarget::Query, Some("a"), "1", RuleOperator::Equals),
            rule(RuleTarget::Query, Some("b"), "nope", RuleOperator::Equals),
        ];

        assert!(!evaluate_rules(&rules, RulesOperator::And, &snapshot, 1));
        assert!(evaluate_rules(&rules, RulesOperator::Or, &snapshot, 1));
    }
}
