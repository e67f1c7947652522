//! Per-route request counters.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic, 1-based request counter for one route.
///
/// `increment()` is a single atomic read-modify-write, so concurrent callers always
/// observe distinct values and no value is skipped.
#[derive(Debug, Default)]
pub struct RequestCounter(AtomicU64);

impl RequestCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment and return the new value (first call returns 1).
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Number of requests counted so far.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// Counters for every route, keyed by route uuid and created on first use.
#[derive(Default)]
pub struct RouteCounters {
    counters: RwLock<HashMap<String, Arc<RequestCounter>>>,
}

impl RouteCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the counter for a route.
    pub fn counter(&self, route_id: &str) -> Arc<RequestCounter> {
        let counters = self.counters.read();
        if let Some(counter) = counters.get(route_id) {
            return Arc::clone(counter);
        }
        drop(counters);

        let mut write = self.counters.write();
        Arc::clone(write.entry(route_id.to_string()).or_default())
    }

    /// Increment the route's counter and return the new value.
    pub fn next_for(&self, route_id: &str) -> u64 {
        self.counter(route_id).increment()
    }

    /// Reset one route, e.g. after its definition was reloaded.
    pub fn reset(&self, route_id: &str) {
        if let Some(counter) = self.counters.read().get(route_id) {
            counter.reset();
        }
    }

    /// Reset every route. Counters are reset in place so handles obtained from
    /// [`RouteCounters::counter`] keep sharing the registry's count.
    pub fn reset_all(&self) {
        for counter in self.counters.read().values() {
            counter.reset();
        }
    }
}
