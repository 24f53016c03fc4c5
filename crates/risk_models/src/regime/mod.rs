//! Volatility-regime classification.
//!
//! A finite Gaussian mixture is fit over engineered features (realized
//! volatility, rolling mean, rolling skew) rather than raw returns, so the
//! discovered regimes discriminate on volatility structure instead of noise.
//! The fitted [`RegimeModel`] carries per-regime asset return distributions
//! and a Markov transition matrix; regimes are ranked by ascending variance
//! so regime 0 is always the calmest across refits.

mod classifier;
mod error;
mod features;
mod model;

pub use classifier::{CovarianceKind, RegimeClassifier, RegimeConfig};
pub use error::RegimeError;
pub use features::{extract_features, N_FEATURES};
pub use model::{RegimeModel, RegimeParams};
