//! Risk-adjusted performance ratios.
//!
//! Sentinel policy for degenerate distributions: a zero-dispersion sample
//! returns 0 where the ratio is 0/0 in spirit (no excess return, no risk)
//! and +∞ where there is genuinely positive excess return with no measured
//! downside. Stress runs hit these cases legitimately, so none of these
//! functions error.

use risk_core::stats;

/// Annualized Sharpe ratio of per-period returns.
///
/// `risk_free_rate` is annual and de-annualized internally. Zero return
/// dispersion returns 0.
pub fn sharpe(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let rf_per_period = risk_free_rate / periods_per_year;
    let excess = stats::mean(returns) - rf_per_period;
    let sd = stats::std_dev(returns);
    if sd <= 0.0 {
        return 0.0;
    }
    excess / sd * periods_per_year.sqrt()
}

/// Annualized Sortino ratio: excess return over downside deviation, where
/// only returns below the per-period risk-free rate contribute to risk.
///
/// Zero downside with positive excess returns +∞; zero downside with
/// non-positive excess returns 0.
pub fn sortino(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let rf_per_period = risk_free_rate / periods_per_year;
    let excess = stats::mean(returns) - rf_per_period;
    let downside_sq: f64 = returns
        .iter()
        .map(|&r| {
            let d = (r - rf_per_period).min(0.0);
            d * d
        })
        .sum::<f64>()
        / returns.len() as f64;
    let downside = downside_sq.sqrt();
    if downside <= 0.0 {
        return if excess > 0.0 { f64::INFINITY } else { 0.0 };
    }
    excess / downside * periods_per_year.sqrt()
}

/// Omega ratio at `threshold`: probability-weighted gains above the
/// threshold over losses below it.
///
/// No losses with some gains returns +∞; an all-at-threshold sample
/// returns 1 (the indifference value).
pub fn omega(returns: &[f64], threshold: f64) -> f64 {
    let mut gains = 0.0;
    let mut losses = 0.0;
    for &r in returns {
        let d = r - threshold;
        if d > 0.0 {
            gains += d;
        } else {
            losses -= d;
        }
    }
    if losses <= 0.0 {
        return if gains > 0.0 { f64::INFINITY } else { 1.0 };
    }
    gains / losses
}

/// Fraction of returns strictly below zero.
pub fn probability_of_loss(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().filter(|&&r| r < 0.0).count() as f64 / returns.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sharpe_positive_for_positive_drift() {
        let returns: Vec<f64> = (0..100)
            .map(|i| 0.001 + 0.0005 * ((i as f64) * 0.9).sin())
            .collect();
        assert!(sharpe(&returns, 0.0, 252.0) > 0.0);
    }

    #[test]
    fn test_sharpe_degenerate_is_zero() {
        assert_eq!(sharpe(&[0.01; 50], 0.0, 252.0), 0.0);
        assert_eq!(sharpe(&[], 0.0, 252.0), 0.0);
    }

    #[test]
    fn test_sortino_ignores_upside_dispersion() {
        // Wild upside, no downside: infinite Sortino, finite Sharpe.
        let returns = [0.01, 0.10, 0.02, 0.08];
        assert_eq!(sortino(&returns, 0.0, 252.0), f64::INFINITY);
        assert!(sharpe(&returns, 0.0, 252.0).is_finite());
    }

    #[test]
    fn test_sortino_zero_downside_zero_excess() {
        assert_eq!(sortino(&[0.0; 10], 0.0, 252.0), 0.0);
    }

    #[test]
    fn test_omega_sentinels() {
        assert_eq!(omega(&[0.01, 0.02], 0.0), f64::INFINITY);
        assert_eq!(omega(&[0.0, 0.0], 0.0), 1.0);
        // Symmetric around the threshold: omega = 1.
        assert_relative_eq!(omega(&[-0.02, 0.02], 0.0), 1.0);
    }

    #[test]
    fn test_probability_of_loss() {
        assert_relative_eq!(probability_of_loss(&[-0.01, 0.01, 0.02, -0.03]), 0.5);
        assert_eq!(probability_of_loss(&[]), 0.0);
        // Zero is not a loss.
        assert_eq!(probability_of_loss(&[0.0, 0.0]), 0.0);
    }
}
