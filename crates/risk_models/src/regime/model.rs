//! Fitted regime model: per-regime return distributions plus Markov
//! transition dynamics.

use risk_core::ReturnSeries;

use super::classifier::FeatureMixture;
use super::error::RegimeError;
use super::features::extract_features;

/// Asset-return distribution of a single regime.
#[derive(Clone, Debug)]
pub struct RegimeParams {
    /// Per-asset daily mean return.
    pub mean: Vec<f64>,
    /// Flat row-major covariance matrix (`n_assets × n_assets`).
    pub covariance: Vec<f64>,
    /// Lower Cholesky factor of `covariance`, cached for path simulation.
    pub cholesky: Vec<f64>,
}

/// Output of [`RegimeClassifier::fit`](super::RegimeClassifier::fit).
///
/// Regimes are indexed `0..K` in ascending variance order; regime 0 is the
/// calmest. The transition matrix row `k` gives next-step probabilities
/// conditioned on being in regime `k`.
#[derive(Clone, Debug)]
pub struct RegimeModel {
    regimes: Vec<RegimeParams>,
    /// Flat row-major `K × K` transition matrix.
    transition: Vec<f64>,
    prob_floor: f64,
    n_assets: usize,
    mixture: FeatureMixture,
}

impl RegimeModel {
    pub(crate) fn from_parts(
        regimes: Vec<RegimeParams>,
        transition: Vec<f64>,
        prob_floor: f64,
        n_assets: usize,
        mixture: FeatureMixture,
    ) -> Self {
        Self {
            regimes,
            transition,
            prob_floor,
            n_assets,
            mixture,
        }
    }

    /// Number of regimes K.
    #[inline]
    pub fn n_regimes(&self) -> usize {
        self.regimes.len()
    }

    /// Number of assets the model was fit on.
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.n_assets
    }

    /// Per-regime return distributions, ascending variance order.
    #[inline]
    pub fn regimes(&self) -> &[RegimeParams] {
        &self.regimes
    }

    /// Minimum transition probability enforced after smoothing.
    #[inline]
    pub fn prob_floor(&self) -> f64 {
        self.prob_floor
    }

    /// Feature-extraction lookback the model was fit with.
    #[inline]
    pub fn lookback(&self) -> usize {
        self.mixture.lookback
    }

    /// Transition probabilities out of regime `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k >= n_regimes()`.
    #[inline]
    pub fn transition_row(&self, k: usize) -> &[f64] {
        let n = self.n_regimes();
        &self.transition[k * n..(k + 1) * n]
    }

    /// Full flat row-major transition matrix.
    #[inline]
    pub fn transition(&self) -> &[f64] {
        &self.transition
    }

    /// Regime membership probabilities for every feature window of `series`.
    ///
    /// Returns one row per window (`n_obs - lookback + 1` rows); each row
    /// is non-negative and sums to 1.
    ///
    /// # Errors
    ///
    /// Returns [`RegimeError::InsufficientData`] when the series is shorter
    /// than the feature lookback.
    pub fn predict_proba(&self, series: &ReturnSeries) -> Result<Vec<Vec<f64>>, RegimeError> {
        let lookback = self.mixture.lookback;
        if series.n_obs() < lookback {
            return Err(RegimeError::InsufficientData {
                required: lookback,
                actual: series.n_obs(),
            });
        }

        let equal = vec![1.0 / series.n_assets() as f64; series.n_assets()];
        let portfolio_returns = series.portfolio_returns(&equal)?;
        let mut feats = extract_features(&portfolio_returns, lookback);
        self.mixture.standardize(&mut feats);

        let (resp, _) = self.mixture.responsibilities(&feats);
        let k = self.n_regimes();
        Ok(resp.chunks_exact(k).map(<[f64]>::to_vec).collect())
    }

    /// Most likely current regime from the final window of `series`, with
    /// the full membership distribution.
    ///
    /// # Errors
    ///
    /// Same conditions as [`predict_proba`](Self::predict_proba).
    pub fn detect_regime(&self, series: &ReturnSeries) -> Result<(usize, Vec<f64>), RegimeError> {
        let proba = self.predict_proba(series)?;
        let last = proba
            .last()
            .cloned()
            .ok_or(RegimeError::InsufficientData {
                required: self.mixture.lookback,
                actual: series.n_obs(),
            })?;
        let regime = last
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(k, _)| k)
            .unwrap_or(0);
        Ok((regime, last))
    }
}
