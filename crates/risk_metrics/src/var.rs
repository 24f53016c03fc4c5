//! Value-at-Risk and expected shortfall.

use risk_core::{stats, DataError};

/// VaR at confidence `confidence` (e.g. 0.95): the `confidence`-quantile of
/// the loss distribution, with losses defined as negated returns and the
/// quantile linearly interpolated between order statistics.
///
/// A positive result is a loss; a profitable-even-at-the-tail distribution
/// yields a negative VaR rather than being clamped.
///
/// # Errors
///
/// Returns [`DataError`] for an empty sample or `confidence` outside [0, 1].
pub fn value_at_risk(returns: &[f64], confidence: f64) -> Result<f64, DataError> {
    let losses: Vec<f64> = returns.iter().map(|r| -r).collect();
    stats::quantile(&losses, confidence)
}

/// CVaR (expected shortfall) at `confidence`: the mean loss among paths
/// whose loss meets or exceeds VaR. Always >= VaR; equals VaR for a
/// degenerate (all-equal) distribution.
///
/// # Errors
///
/// Same conditions as [`value_at_risk`].
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> Result<f64, DataError> {
    let var = value_at_risk(returns, confidence)?;
    let tol = 1e-12;
    let mut sum = 0.0;
    let mut count = 0usize;
    for &r in returns {
        let loss = -r;
        if loss >= var - tol {
            sum += loss;
            count += 1;
        }
    }
    if count == 0 {
        // Interpolated VaR can sit above every discrete loss only through
        // round-off; fall back to the worst loss.
        return Ok(returns.iter().fold(f64::NEG_INFINITY, |a, &r| a.max(-r)));
    }
    Ok(sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_var_simple_quantile() {
        // Losses: 10%, 5%, 0%, -5% (a gain). 0.75-quantile of sorted losses
        // [-0.05, 0.0, 0.05, 0.10] interpolates to 0.0625.
        let returns = [-0.10, -0.05, 0.0, 0.05];
        let var = value_at_risk(&returns, 0.75).unwrap();
        assert_relative_eq!(var, 0.0625, epsilon = 1e-12);
    }

    #[test]
    fn test_cvar_dominates_var() {
        let returns: Vec<f64> = (0..100).map(|i| -0.001 * i as f64).collect();
        let var = value_at_risk(&returns, 0.95).unwrap();
        let cvar = conditional_value_at_risk(&returns, 0.95).unwrap();
        assert!(cvar >= var);
    }

    #[test]
    fn test_degenerate_distribution() {
        let returns = [-0.02; 50];
        let var = value_at_risk(&returns, 0.99).unwrap();
        let cvar = conditional_value_at_risk(&returns, 0.99).unwrap();
        assert_relative_eq!(var, 0.02);
        assert_relative_eq!(cvar, 0.02);
    }

    #[test]
    fn test_profitable_tail_gives_negative_var() {
        let returns = [0.01, 0.02, 0.03, 0.04];
        assert!(value_at_risk(&returns, 0.95).unwrap() < 0.0);
    }

    #[test]
    fn test_empty_input_errors() {
        assert!(value_at_risk(&[], 0.95).is_err());
        assert!(value_at_risk(&[0.1], 1.5).is_err());
    }
}
