//! Drawdown statistics over value trajectories.

use risk_core::{stats, DataError};

/// Maximum drawdown of one trajectory:
/// `min_t (V_t − running_max(V_{≤t})) / running_max(V_{≤t})`.
///
/// Always <= 0; a monotonically rising (or empty) trajectory returns 0.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (v - peak) / peak;
            if dd < worst {
                worst = dd;
            }
        }
    }
    worst
}

/// Per-step drawdown series of one trajectory (each entry <= 0).
pub fn drawdown_series(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            if v > peak {
                peak = v;
            }
            if peak > 0.0 {
                (v - peak) / peak
            } else {
                0.0
            }
        })
        .collect()
}

/// CDaR at `confidence`: expected shortfall of the per-path maximum
/// drawdown magnitudes. `drawdowns` are the per-path values from
/// [`max_drawdown`] (all <= 0); the result is a positive magnitude.
///
/// # Errors
///
/// Returns [`DataError`] for an empty sample or `confidence` outside [0, 1].
pub fn conditional_drawdown_at_risk(drawdowns: &[f64], confidence: f64) -> Result<f64, DataError> {
    let magnitudes: Vec<f64> = drawdowns.iter().map(|d| -d).collect();
    let threshold = stats::quantile(&magnitudes, confidence)?;
    let tol = 1e-12;
    let mut sum = 0.0;
    let mut count = 0usize;
    for &m in &magnitudes {
        if m >= threshold - tol {
            sum += m;
            count += 1;
        }
    }
    if count == 0 {
        return Ok(threshold);
    }
    Ok(sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_max_drawdown_simple() {
        // Peak 120, trough 90: drawdown -25%.
        let values = [100.0, 120.0, 90.0, 110.0];
        assert_relative_eq!(max_drawdown(&values), -0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_monotone_rise_has_zero_drawdown() {
        let values = [100.0, 101.0, 102.0, 110.0];
        assert_eq!(max_drawdown(&values), 0.0);
        assert!(drawdown_series(&values).iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_drawdown_series_tracks_peak() {
        let values = [100.0, 80.0, 90.0, 120.0, 60.0];
        let dd = drawdown_series(&values);
        assert_relative_eq!(dd[1], -0.20, epsilon = 1e-12);
        assert_relative_eq!(dd[2], -0.10, epsilon = 1e-12);
        assert_eq!(dd[3], 0.0);
        assert_relative_eq!(dd[4], -0.50, epsilon = 1e-12);
    }

    #[test]
    fn test_cdar_exceeds_typical_drawdown() {
        let drawdowns: Vec<f64> = (0..100).map(|i| -0.001 * i as f64).collect();
        let cdar = conditional_drawdown_at_risk(&drawdowns, 0.95).unwrap();
        let mean_magnitude = drawdowns.iter().map(|d| -d).sum::<f64>() / 100.0;
        assert!(cdar > mean_magnitude);
        assert!(cdar <= 0.099 + 1e-12);
    }

    #[test]
    fn test_empty_trajectory() {
        assert_eq!(max_drawdown(&[]), 0.0);
        assert!(conditional_drawdown_at_risk(&[], 0.95).is_err());
    }
}
