//! # risk_models (Model Layer)
//!
//! Fitted statistical models consumed by the simulation engine:
//!
//! - [`regime`]: finite-mixture volatility-regime classifier with a Markov
//!   transition matrix ([`RegimeClassifier`] → [`RegimeModel`])
//! - [`garch`]: GARCH(p,q) conditional-volatility forecaster with Normal or
//!   Student-t innovations ([`GarchSpec`] → [`GarchModel`])
//!
//! Fitting happens once, before any simulation starts; fitted models are
//! immutable and shared read-only across all simulated paths.

pub mod garch;
mod optim;
pub mod regime;

pub use garch::{GarchError, GarchModel, GarchSpec, GarchState, Innovation};
pub use regime::{
    CovarianceKind, RegimeClassifier, RegimeConfig, RegimeError, RegimeModel, RegimeParams,
};
