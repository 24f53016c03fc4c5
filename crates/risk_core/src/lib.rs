//! # risk_core (Foundation Layer)
//!
//! Shared data model and descriptive numerics for the regimemc risk engine:
//!
//! - [`ReturnSeries`]: validated, read-only historical return history
//! - [`Portfolio`]: per-path portfolio state with trading bounds
//! - [`stats`]: moments, quantiles, covariance and Cholesky helpers
//!
//! Everything in this crate is passive data plus pure functions; fitting and
//! simulation live in the layers above.

pub mod error;
pub mod portfolio;
pub mod series;
pub mod stats;

pub use error::DataError;
pub use portfolio::{Portfolio, TradingBounds};
pub use series::ReturnSeries;
