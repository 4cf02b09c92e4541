//! Unified error types for the IMDP workspace
//!
//! This module provides a common error type [`ImdpError`] that can
//! represent errors from any part of the system: ambiguity-set
//! construction, shape validation, convergence failures, user callbacks,
//! and I/O. Constructors report the first violated invariant through the
//! nested [`AmbiguityError`] so callers can tell exactly which condition
//! failed.

use thiserror::Error;

/// A violated ambiguity-set invariant, detected at construction.
///
/// An interval ambiguity column over targets `1..n` is a pair of vectors
/// `lower <= upper` in `[0, 1]^n` with `sum(lower) <= 1 <= sum(upper)`;
/// the feasible distributions are those between the bounds that sum to
/// one. Each variant names the condition that ruled the column out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmbiguityError {
    /// A lower bound exceeds the matching upper bound.
    #[error("column {col}: lower bound exceeds upper bound at row {row}")]
    LowerAboveUpper { col: usize, row: usize },

    /// A bound falls outside the unit interval.
    #[error("column {col}: probability bound at row {row} outside [0, 1]")]
    EntryOutOfRange { col: usize, row: usize },

    /// Lower bounds sum to more than one, so no distribution fits.
    #[error("column {col}: lower bounds sum to more than one")]
    LowerSumExceedsOne { col: usize },

    /// Upper bounds sum to less than one, so no distribution fits.
    #[error("column {col}: upper bounds sum to less than one")]
    UpperSumBelowOne { col: usize },

    /// A column with no entries cannot carry any probability mass.
    #[error("column {col} has no entries")]
    EmptyColumn { col: usize },

    /// Sparse lower and upper matrices disagree on their nonzero pattern.
    #[error("sparse lower and upper matrices have different sparsity patterns")]
    PatternMismatch,
}

/// Unified error type for all IMDP operations.
#[derive(Error, Debug)]
pub enum ImdpError {
    /// The interval bounds do not describe a nonempty ambiguity set.
    #[error("invalid ambiguity set: {0}")]
    InvalidAmbiguitySet(#[from] AmbiguityError),

    /// Value function, strategy, or model dimensions are inconsistent.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Infinite-horizon iteration hit the iteration cap. Non-fatal: the
    /// solver returns the current value function with a flag, and this
    /// error is only produced when the caller insists on convergence.
    #[error("did not converge within {max_iterations} iterations (residual {residual})")]
    NotConverged {
        max_iterations: usize,
        residual: String,
    },

    /// A user-supplied iteration callback returned an error.
    #[error("callback aborted iteration: {0}")]
    CallbackAborted(String),

    /// I/O errors (file access etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("parse error: {0}")]
    Parse(String),
}

/// Convenience type alias for Results using ImdpError.
pub type ImdpResult<T> = Result<T, ImdpError>;

impl From<anyhow::Error> for ImdpError {
    fn from(err: anyhow::Error) -> Self {
        ImdpError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ImdpError {
    fn from(err: serde_json::Error) -> Self {
        ImdpError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguity_error_display() {
        let err: ImdpError = AmbiguityError::LowerSumExceedsOne { col: 3 }.into();
        assert!(err.to_string().contains("invalid ambiguity set"));
        assert!(err.to_string().contains("column 3"));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> ImdpResult<()> {
            Err(ImdpError::ShapeMismatch("test".into()))
        }

        fn outer() -> ImdpResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ImdpError = io_err.into();
        assert!(matches!(err, ImdpError::Io(_)));
    }
}
