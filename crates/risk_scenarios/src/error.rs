//! Scenario catalog error types.

use thiserror::Error;

/// Errors raised during scenario catalog construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    /// Catalog weights do not sum to 1. Never silently renormalized.
    #[error("scenario weights sum to {sum}, expected 1 (tolerance 1e-6)")]
    InvalidWeights {
        /// Actual weight sum.
        sum: f64,
    },

    /// The catalog contains no scenarios.
    #[error("scenario catalog is empty")]
    Empty,

    /// The per-period stress-injection probability is out of range.
    #[error("injection probability {value} not in [0, 1)")]
    InvalidInjectionProbability {
        /// Offending value.
        value: f64,
    },

    /// A scenario field is out of range.
    #[error("invalid scenario field {name} for '{scenario}': {value}")]
    InvalidField {
        /// Scenario name.
        scenario: String,
        /// Field name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}
