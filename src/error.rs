//! Error kinds shared across the crate.
//!
//! Shape and parameter errors surface immediately at the boundary of the
//! offending operation; they indicate caller misuse and are never retried.
//! No-signal conditions (missing judgments, ranking intersections too small
//! for Kendall tau) are absorbed into well-defined metric values in
//! [`crate::eval`] and [`crate::dynamics`] and do not appear here.

use thiserror::Error;

/// Errors from guard, search, evaluation and sweep orchestration.
#[derive(Debug, Error)]
pub enum RankGuardError {
    /// Embedding dimension or row-count inconsistency.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// A required input carries no rows or no columns.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// A parameter is outside its valid range (k = 0, unknown reference ε, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A sink could not durably store a record; fatal, aborts the sweep.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

pub type Result<T> = std::result::Result<T, RankGuardError>;
