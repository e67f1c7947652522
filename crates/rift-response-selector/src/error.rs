//! Error types for response selection.

/// Errors surfaced by the selector.
///
/// Rule problems (missing target, missing modifier, malformed regex) are not
/// errors: they make the rule evaluate to false.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    /// The selector was asked to choose from an empty candidate list
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid route configuration: {0}")]
    Config(String),
}
