// Library exports for the selector binary, benchmarks and tests

// ===== Request side =====
pub mod request;
pub mod value;

// ===== Rules and selection =====
pub mod error;
pub mod rules;
pub mod selector;

pub use error::SelectorError;
pub use request::{IncomingRequest, RequestSnapshot};
pub use rules::{Rule, RuleOperator, RuleTarget, RulesOperator};
pub use selector::{
    select_response, CompiledRoute, RequestCounter, Route, RouteCounters, RouteResponse,
    SelectedResponse, Selection, SelectionMode, SelectionReason,
};
