//! GARCH(p,q) conditional-volatility forecasting.
//!
//! One model per asset; paths drive the recursion through
//! [`GarchModel::step`] with their own [`GarchState`], so the fitted model
//! stays immutable and shareable across threads. Fitting is
//! maximum-likelihood via Nelder-Mead with winsorized residuals and a
//! variance-targeting initialization.

mod error;
mod fit;
mod model;

pub use error::GarchError;
pub use model::{
    GarchModel, GarchSpec, GarchState, Innovation, DEFAULT_VOL_TARGET, PERIODS_PER_YEAR,
};
