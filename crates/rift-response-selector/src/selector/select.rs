//! Response selection: random, sequential and rule-based modes.

use crate::error::SelectorError;
use crate::request::RequestSnapshot;
use crate::rules::CompiledRules;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// How a route picks among its responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// First response whose rules match, else the first response
    #[default]
    RuleBased,
    /// Uniformly random response, rules ignored
    Random,
    /// Round-robin over responses by request number, rules ignored
    Sequential,
}

impl SelectionMode {
    /// Map route flags to a mode. `random` takes precedence over `sequential`.
    pub fn from_flags(random: bool, sequential: bool) -> Self {
        if random {
            SelectionMode::Random
        } else if sequential {
            SelectionMode::Sequential
        } else {
            SelectionMode::RuleBased
        }
    }
}

/// Why a response was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    Random,
    Sequential,
    RuleMatch,
    /// No rules matched; first response returned
    Fallback,
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SelectionReason::Random => "random",
            SelectionReason::Sequential => "sequential",
            SelectionReason::RuleMatch => "rule match",
            SelectionReason::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// Outcome of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub index: usize,
    pub reason: SelectionReason,
}

/// Select a response index using the thread-local RNG for random mode.
///
/// `candidates` holds the compiled rules of each response, in route order.
/// `request_number` is the route's counter value for this request (1-based).
pub fn select_response(
    candidates: &[CompiledRules],
    mode: SelectionMode,
    snapshot: &RequestSnapshot<'_>,
    request_number: u64,
) -> Result<Selection, SelectorError> {
    select_response_with_rng(
        candidates,
        mode,
        snapshot,
        request_number,
        &mut rand::thread_rng(),
    )
}

/// Select a response index with an explicit randomness source.
pub fn select_response_with_rng<R: Rng>(
    candidates: &[CompiledRules],
    mode: SelectionMode,
    snapshot: &RequestSnapshot<'_>,
    request_number: u64,
    rng: &mut R,
) -> Result<Selection, SelectorError> {
    let count = candidates.len();
    if count == 0 {
        return Err(SelectorError::InvalidState(
            "cannot select a response from an empty response list".to_string(),
        ));
    }

    let selection = match mode {
        SelectionMode::Random => Selection {
            index: rng.gen_range(0..count),
            reason: SelectionReason::Random,
        },
        SelectionMode::Sequential => Selection {
            index: sequential_index(request_number, count),
            reason: SelectionReason::Sequential,
        },
        SelectionMode::RuleBased => candidates
            .iter()
            .position(|rules| rules.matches(snapshot, request_number))
            .map_or(
                Selection {
                    index: 0,
                    reason: SelectionReason::Fallback,
                },
                |index| Selection {
                    index,
                    reason: SelectionReason::RuleMatch,
                },
            ),
    };

    debug!(
        ?mode,
        request_number,
        index = selection.index,
        reason = %selection.reason,
        "Selected response"
    );
    Ok(selection)
}

/// `(request_number - 1) mod count`; request 1 maps to index 0.
fn sequential_index(request_number: u64, count: usize) -> usize {
    (request_number.saturating_sub(1) % count as u64) as usize
}
