//! Simulation error types.

use risk_core::DataError;
use risk_models::{GarchError, RegimeError};
use risk_scenarios::ScenarioError;
use thiserror::Error;

/// Errors raised while validating a [`SimulationConfig`](crate::SimulationConfig).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A parameter is outside its allowed range.
    #[error("invalid simulation parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Per-path failure. Isolated to the path that produced it; the engine
/// tolerates a bounded fraction of these.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// A non-finite portfolio value or return appeared mid-path.
    #[error("non-finite value at step {step}")]
    NumericDivergence {
        /// Step at which the divergence occurred.
        step: usize,
    },
}

/// Run-level simulation errors. A failed run exposes no partial result.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// The fraction of failed paths exceeded the configured ceiling,
    /// signalling a systemic model problem rather than path-level noise.
    #[error(
        "excessive failure rate: {failed}/{total} paths failed \
         (ceiling {ceiling})"
    )]
    ExcessiveFailureRate {
        /// Failed path count.
        failed: usize,
        /// Total scheduled paths.
        total: usize,
        /// Configured failure-fraction ceiling.
        ceiling: f64,
    },

    /// Model inputs do not fit together (asset-count mismatch, unknown
    /// initial regime, ...).
    #[error("incompatible inputs: {0}")]
    IncompatibleInputs(String),

    /// Invalid run configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Regime model error surfaced during setup.
    #[error(transparent)]
    Regime(#[from] RegimeError),

    /// Volatility model error surfaced during setup.
    #[error(transparent)]
    Garch(#[from] GarchError),

    /// Scenario catalog error surfaced during setup.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// Numerical error while preparing stressed covariance factors.
    #[error(transparent)]
    Data(#[from] DataError),
}
