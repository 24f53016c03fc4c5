//! A single stress scenario and its return/covariance adjustments.

use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;

/// One entry of the stress catalog.
///
/// Applied to a simulated return as `r × vol_multiplier + return_shift`.
/// For multi-asset paths the correlation shift additionally perturbs the
/// covariance used for the residual draw (see
/// [`stressed_covariance`](Scenario::stressed_covariance)); it is never
/// applied post hoc to already-decorrelated scalars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Display name ("base", "black_monday", ...).
    pub name: String,
    /// Draw probability within the catalog; all weights sum to 1.
    pub weight: f64,
    /// Multiplier on the simulated return.
    pub vol_multiplier: f64,
    /// Additive return shift (e.g. -0.23 for Black Monday).
    pub return_shift: f64,
    /// Correlation stress in [-1, 1]: positive blends pairwise correlations
    /// toward 1 (crisis co-movement), negative shrinks them toward 0.
    pub correlation_shift: f64,
}

impl Scenario {
    /// The no-stress entry: unit multiplier, no shift.
    pub fn base(weight: f64) -> Self {
        Self {
            name: "base".to_string(),
            weight,
            vol_multiplier: 1.0,
            return_shift: 0.0,
            correlation_shift: 0.0,
        }
    }

    /// Validates field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::InvalidField`] for out-of-range values.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let field = |name: &'static str, value: f64| ScenarioError::InvalidField {
            scenario: self.name.clone(),
            name,
            value,
        };
        if !(self.weight >= 0.0 && self.weight.is_finite()) {
            return Err(field("weight", self.weight));
        }
        if !(self.vol_multiplier > 0.0 && self.vol_multiplier.is_finite()) {
            return Err(field("vol_multiplier", self.vol_multiplier));
        }
        if !(self.return_shift.is_finite() && self.return_shift.abs() < 1.0) {
            return Err(field("return_shift", self.return_shift));
        }
        if !((-1.0..=1.0).contains(&self.correlation_shift)) {
            return Err(field("correlation_shift", self.correlation_shift));
        }
        Ok(())
    }

    /// Adjusts a simulated return: `r × vol_multiplier + return_shift`.
    #[inline]
    pub fn apply(&self, simulated_return: f64) -> f64 {
        simulated_return * self.vol_multiplier + self.return_shift
    }

    /// Whether applying this scenario changes anything.
    #[inline]
    pub fn is_neutral(&self) -> bool {
        self.vol_multiplier == 1.0 && self.return_shift == 0.0 && self.correlation_shift == 0.0
    }

    /// Covariance under the scenario's correlation stress.
    ///
    /// Variances are preserved; each pairwise correlation is blended toward
    /// comonotonic for a positive shift (`ρ' = ρ + s·(1 − ρ)`) or shrunk
    /// toward independence for a negative one (`ρ' = (1 + s)·ρ`). The
    /// result stays a valid correlation structure, so Cholesky
    /// factorization downstream remains viable.
    pub fn stressed_covariance(&self, cov: &[f64], dim: usize) -> Vec<f64> {
        let s = self.correlation_shift;
        if s == 0.0 || dim < 2 {
            return cov.to_vec();
        }
        let mut out = cov.to_vec();
        for i in 0..dim {
            for j in (i + 1)..dim {
                let vi = cov[i * dim + i];
                let vj = cov[j * dim + j];
                let denom = (vi * vj).sqrt();
                if denom <= 0.0 {
                    continue;
                }
                let rho = (cov[i * dim + j] / denom).clamp(-1.0, 1.0);
                let shifted = if s > 0.0 {
                    rho + s * (1.0 - rho)
                } else {
                    (1.0 + s) * rho
                };
                let c = shifted.clamp(-0.999, 0.999) * denom;
                out[i * dim + j] = c;
                out[j * dim + i] = c;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_base_is_neutral() {
        let base = Scenario::base(0.7);
        assert!(base.is_neutral());
        assert_relative_eq!(base.apply(0.013), 0.013);
    }

    #[test]
    fn test_apply_scales_and_shifts() {
        let s = Scenario {
            name: "crash".to_string(),
            weight: 0.1,
            vol_multiplier: 2.0,
            return_shift: -0.05,
            correlation_shift: 0.0,
        };
        assert_relative_eq!(s.apply(0.01), -0.03);
    }

    #[test]
    fn test_validation_rejects_bad_fields() {
        let mut s = Scenario::base(0.5);
        s.vol_multiplier = 0.0;
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::InvalidField {
                name: "vol_multiplier",
                ..
            })
        ));
        let mut s = Scenario::base(0.5);
        s.return_shift = -1.5;
        assert!(s.validate().is_err());
        let mut s = Scenario::base(0.5);
        s.correlation_shift = 1.2;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_stressed_covariance_raises_correlation() {
        // Two assets, vol 2% and 3%, correlation 0.5.
        let cov = [4e-4, 3e-4, 3e-4, 9e-4];
        let mut s = Scenario::base(1.0);
        s.correlation_shift = 0.5;
        let out = s.stressed_covariance(&cov, 2);
        // Variances untouched.
        assert_relative_eq!(out[0], 4e-4);
        assert_relative_eq!(out[3], 9e-4);
        // rho 0.5 -> 0.75
        let rho = out[1] / (out[0] * out[3]).sqrt();
        assert_relative_eq!(rho, 0.75, epsilon = 1e-12);
        assert_relative_eq!(out[1], out[2]);
    }

    #[test]
    fn test_negative_shift_shrinks_toward_independence() {
        let cov = [4e-4, 3e-4, 3e-4, 9e-4];
        let mut s = Scenario::base(1.0);
        s.correlation_shift = -1.0;
        let out = s.stressed_covariance(&cov, 2);
        assert_relative_eq!(out[1], 0.0);
    }

    #[test]
    fn test_zero_shift_is_identity() {
        let cov = [4e-4, 3e-4, 3e-4, 9e-4];
        let s = Scenario::base(1.0);
        assert_eq!(s.stressed_covariance(&cov, 2), cov.to_vec());
    }
}
