//! Regime-classifier error types.

use risk_core::DataError;
use thiserror::Error;

/// Errors raised while fitting or applying the regime classifier.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegimeError {
    /// Too little history to fit the requested mixture.
    #[error("insufficient data: {actual} observations, need at least {required}")]
    InsufficientData {
        /// Minimum observations required (5 × n_regimes × n_features).
        required: usize,
        /// Observations supplied.
        actual: usize,
    },

    /// The EM optimization did not converge within its iteration budget.
    ///
    /// Surfaced rather than silently accepted: a non-converged mixture
    /// produces unreliable transition probabilities.
    #[error("mixture fit did not converge within {iterations} iterations")]
    Convergence {
        /// Iteration budget that was exhausted.
        iterations: usize,
    },

    /// Invalid classifier configuration.
    #[error("invalid regime configuration: {0}")]
    InvalidConfig(String),

    /// Underlying data error.
    #[error(transparent)]
    Data(#[from] DataError),
}
