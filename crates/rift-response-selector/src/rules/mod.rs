//! Response rules: configuration, modifier paths and evaluation.
//!
//! A rule reads one value from the request (body, query, path params, headers,
//! cookies or the route's request number) and compares it using one of the
//! operators `equals`, `regex`, `null` or `empty_array`. A response combines its
//! rules with `AND` or `OR`.
//!
//! # Module Structure
//!
//! - `types` - Rule configuration (serde)
//! - `path` - Modifier path walker and JSONPath support
//! - `evaluator` - Compiled rules and operator semantics

mod evaluator;
mod path;
mod types;

pub use evaluator::{evaluate_rule, evaluate_rules, CompiledRule, CompiledRules, RulePattern};
pub use path::{split_path, walk, ModifierPath};
pub use types::{Rule, RuleOperator, RuleTarget, RulesOperator};
