//! Response selection for mock routes.
//!
//! This module provides:
//! - `SelectionMode`: rule-based (default), random or sequential selection
//! - `select_response`: pick one candidate for a request
//! - `RequestCounter` / `RouteCounters`: per-route, 1-based request numbering
//! - `Route` / `CompiledRoute`: route definitions and their compiled form
//!
//! ## Module Structure
//!
//! - `select`: mode state machine and rule-based scan with fallback
//! - `counter`: atomic request counters
//! - `route`: route configuration, loading and compiled selection

mod counter;
mod route;
mod select;

pub use counter::{RequestCounter, RouteCounters};
pub use route::{CompiledRoute, Header, Route, RouteResponse, SelectedResponse};
pub use select::{
    select_response, select_response_with_rng, Selection, SelectionMode, SelectionReason,
};
