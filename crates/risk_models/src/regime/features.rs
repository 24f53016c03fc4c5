//! Feature engineering for the regime mixture.
//!
//! Each observation is summarized by the trailing-window sufficient
//! statistics the mixture is fit on: realized volatility, rolling mean
//! return, and rolling skewness. The default 21-day lookback is the
//! one-month estimation window; 63 and 252 are the other conventional
//! horizons for slower regime definitions.

use risk_core::stats;

/// Number of engineered features per observation.
pub const N_FEATURES: usize = 3;

/// Default trailing lookback (one trading month).
pub const DEFAULT_LOOKBACK: usize = 21;

/// Extracts the feature matrix from a portfolio-level return series.
///
/// Returns a row-major `(returns.len() - lookback + 1) × N_FEATURES` matrix;
/// row `i` summarizes the window ending at observation `lookback - 1 + i`.
/// Caller guarantees `returns.len() >= lookback` and `lookback >= 2`.
pub fn extract_features(returns: &[f64], lookback: usize) -> Vec<f64> {
    debug_assert!(lookback >= 2 && returns.len() >= lookback);
    let n_rows = returns.len() - lookback + 1;
    let mut out = Vec::with_capacity(n_rows * N_FEATURES);
    for i in 0..n_rows {
        let window = &returns[i..i + lookback];
        out.push(stats::std_dev(window));
        out.push(stats::mean(window));
        out.push(stats::skewness(window));
    }
    out
}
