//! GARCH error types.

use risk_core::DataError;
use thiserror::Error;

/// Errors raised while fitting or evaluating a GARCH model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GarchError {
    /// Too little history to fit the requested orders.
    #[error("insufficient data: {actual} observations, need at least {required}")]
    InsufficientData {
        /// Minimum observations required for the requested (p, q).
        required: usize,
        /// Observations supplied.
        actual: usize,
    },

    /// The fitted recursion is non-stationary or produces a non-positive
    /// variance path. Flagged, never silently clipped.
    #[error(
        "non-positive variance path: omega {omega}, persistence {persistence} \
         (stationarity requires omega > 0 and persistence < 1)"
    )]
    NonPositiveVariance {
        /// Recursion intercept.
        omega: f64,
        /// Sum of ARCH and GARCH coefficients.
        persistence: f64,
    },

    /// The likelihood optimization did not converge within its budget.
    #[error("likelihood optimization did not converge within {iterations} iterations")]
    Convergence {
        /// Iteration budget that was exhausted.
        iterations: usize,
    },

    /// Invalid model specification.
    #[error("invalid GARCH parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// Underlying data error.
    #[error(transparent)]
    Data(#[from] DataError),
}
