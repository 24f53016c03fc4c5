//! Error types for the foundation layer.

use thiserror::Error;

/// Validation errors raised when constructing core data types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// The input container is empty.
    #[error("empty input: {0}")]
    Empty(&'static str),

    /// Two inputs that must agree in length do not.
    #[error("length mismatch: expected {expected}, got {actual} for {what}")]
    LengthMismatch {
        /// What was being validated.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// A NaN or infinite value was found.
    #[error("non-finite value at index {0}")]
    NonFinite(usize),

    /// The time index is not strictly increasing.
    #[error("time index not strictly increasing at observation {0}")]
    NonIncreasingDates(usize),

    /// A covariance matrix could not be factorized.
    #[error("matrix is not positive definite (pivot {pivot} at row {row})")]
    NotPositiveDefinite {
        /// Offending diagonal pivot value.
        pivot: f64,
        /// Row index of the failing pivot.
        row: usize,
    },

    /// An invalid parameter value was supplied.
    #[error("invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },
}
