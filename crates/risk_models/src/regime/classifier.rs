//! Gaussian-mixture fitting for regime discovery.

use risk_core::{stats, ReturnSeries};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::RegimeError;
use super::features::{extract_features, DEFAULT_LOOKBACK, N_FEATURES};
use super::model::{RegimeModel, RegimeParams};

/// Covariance structure of the feature-space mixture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CovarianceKind {
    /// Full covariance per component.
    #[default]
    Full,
    /// Diagonal covariance per component (cheaper, more robust on short
    /// histories).
    Diagonal,
}

/// Configuration for [`RegimeClassifier`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegimeConfig {
    /// Number of regimes K.
    pub n_regimes: usize,
    /// Trailing window for feature extraction.
    pub lookback: usize,
    /// Mixture covariance structure.
    pub covariance: CovarianceKind,
    /// EM iteration budget.
    pub max_iterations: usize,
    /// Relative log-likelihood convergence tolerance.
    pub tolerance: f64,
    /// Minimum transition probability after smoothing.
    pub prob_floor: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            n_regimes: 3,
            lookback: DEFAULT_LOOKBACK,
            covariance: CovarianceKind::default(),
            max_iterations: 200,
            tolerance: 1e-6,
            prob_floor: 1e-3,
        }
    }
}

impl RegimeConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegimeError::InvalidConfig`] for out-of-range values.
    pub fn validate(&self) -> Result<(), RegimeError> {
        if !(2..=16).contains(&self.n_regimes) {
            return Err(RegimeError::InvalidConfig(format!(
                "n_regimes {} not in [2, 16]",
                self.n_regimes
            )));
        }
        if self.lookback < 5 {
            return Err(RegimeError::InvalidConfig(format!(
                "lookback {} must be >= 5",
                self.lookback
            )));
        }
        if self.max_iterations == 0 {
            return Err(RegimeError::InvalidConfig(
                "max_iterations must be positive".to_string(),
            ));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(RegimeError::InvalidConfig(format!(
                "tolerance {} must be positive",
                self.tolerance
            )));
        }
        let max_floor = 1.0 / self.n_regimes as f64;
        if !(0.0..max_floor).contains(&self.prob_floor) {
            return Err(RegimeError::InvalidConfig(format!(
                "prob_floor {} not in [0, 1/K)",
                self.prob_floor
            )));
        }
        Ok(())
    }

    /// Minimum observations required to fit: `5 × n_regimes × n_features`.
    #[inline]
    pub fn min_observations(&self) -> usize {
        5 * self.n_regimes * N_FEATURES
    }
}

/// Feature-space Gaussian mixture, retained inside the fitted model so
/// regime membership can be evaluated on new windows.
#[derive(Clone, Debug)]
pub(crate) struct FeatureMixture {
    pub(crate) n_components: usize,
    /// Mixing weights (K).
    pub(crate) weights: Vec<f64>,
    /// Component means in standardized feature space (K × d).
    pub(crate) means: Vec<f64>,
    /// Lower Cholesky factors of component covariances (K × d × d).
    pub(crate) chols: Vec<f64>,
    /// Log-determinants of component covariances (K).
    pub(crate) log_dets: Vec<f64>,
    /// Per-feature standardization mean (d).
    pub(crate) feat_mean: Vec<f64>,
    /// Per-feature standardization std (d).
    pub(crate) feat_std: Vec<f64>,
    /// Lookback used for feature extraction.
    pub(crate) lookback: usize,
}

const LN_2PI: f64 = 1.837_877_066_409_345_5;
const VAR_FLOOR: f64 = 1e-6;

impl FeatureMixture {
    /// Standardizes a raw feature matrix in place.
    pub(crate) fn standardize(&self, feats: &mut [f64]) {
        let d = N_FEATURES;
        for row in feats.chunks_exact_mut(d) {
            for j in 0..d {
                row[j] = (row[j] - self.feat_mean[j]) / self.feat_std[j];
            }
        }
    }

    /// Log density of component `k` at a standardized feature row.
    fn log_prob(&self, k: usize, x: &[f64]) -> f64 {
        let d = N_FEATURES;
        let mean = &self.means[k * d..(k + 1) * d];
        let chol = &self.chols[k * d * d..(k + 1) * d * d];

        // Forward-substitute L y = (x - mu), then |y|^2 is the Mahalanobis
        // quadratic form.
        let mut quad = 0.0;
        let mut y = [0.0; N_FEATURES];
        for i in 0..d {
            let mut acc = x[i] - mean[i];
            for j in 0..i {
                acc -= chol[i * d + j] * y[j];
            }
            y[i] = acc / chol[i * d + i];
            quad += y[i] * y[i];
        }
        -0.5 * (d as f64 * LN_2PI + self.log_dets[k] + quad)
    }

    /// E-step over a standardized feature matrix.
    ///
    /// Returns the flat `m × K` responsibility matrix (rows sum to 1) and
    /// the total log-likelihood.
    pub(crate) fn responsibilities(&self, feats_std: &[f64]) -> (Vec<f64>, f64) {
        let d = N_FEATURES;
        let k_count = self.n_components;
        let m = feats_std.len() / d;
        let mut resp = vec![0.0; m * k_count];
        let mut ll = 0.0;

        let log_weights: Vec<f64> = self.weights.iter().map(|w| w.max(1e-300).ln()).collect();
        for (i, row) in feats_std.chunks_exact(d).enumerate() {
            let lp: Vec<f64> = (0..k_count)
                .map(|k| log_weights[k] + self.log_prob(k, row))
                .collect();
            let max_lp = lp.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let sum_exp: f64 = lp.iter().map(|&v| (v - max_lp).exp()).sum();
            let lse = max_lp + sum_exp.ln();
            ll += lse;
            for k in 0..k_count {
                resp[i * k_count + k] = (lp[k] - lse).exp();
            }
        }
        (resp, ll)
    }
}

/// Fits a [`RegimeModel`] from historical returns.
///
/// # Examples
///
/// ```no_run
/// use risk_models::regime::{RegimeClassifier, RegimeConfig};
/// # fn series() -> risk_core::ReturnSeries { unimplemented!() }
///
/// let classifier = RegimeClassifier::new(RegimeConfig::default()).unwrap();
/// let model = classifier.fit(&series()).unwrap();
/// assert_eq!(model.n_regimes(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct RegimeClassifier {
    config: RegimeConfig,
}

impl RegimeClassifier {
    /// Creates a classifier with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegimeError::InvalidConfig`] for an invalid configuration.
    pub fn new(config: RegimeConfig) -> Result<Self, RegimeError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Fits the mixture, ranks regimes by ascending variance, and estimates
    /// the transition matrix.
    ///
    /// Multi-asset input is collapsed to equal-weight portfolio returns for
    /// feature extraction; per-regime asset-level means and covariances are
    /// estimated from the full asset rows afterwards.
    ///
    /// # Errors
    ///
    /// - [`RegimeError::InsufficientData`] below `5 × K × n_features`
    ///   observations
    /// - [`RegimeError::Convergence`] if EM exhausts its iteration budget
    pub fn fit(&self, series: &ReturnSeries) -> Result<RegimeModel, RegimeError> {
        let cfg = &self.config;
        let required = cfg.min_observations().max(cfg.lookback + cfg.n_regimes);
        if series.n_obs() < required {
            return Err(RegimeError::InsufficientData {
                required,
                actual: series.n_obs(),
            });
        }

        let n_assets = series.n_assets();
        let equal = vec![1.0 / n_assets as f64; n_assets];
        let portfolio_returns = series.portfolio_returns(&equal)?;

        let raw = extract_features(&portfolio_returns, cfg.lookback);
        let d = N_FEATURES;
        let m = raw.len() / d;
        let k_count = cfg.n_regimes;

        let mut mixture = init_mixture(&raw, m, k_count, cfg.lookback);
        let mut feats = raw;
        mixture.standardize(&mut feats);

        // EM iterations.
        let mut prev_ll = f64::NEG_INFINITY;
        let mut converged_at = None;
        let mut resp = vec![0.0; m * k_count];
        for iteration in 0..cfg.max_iterations {
            let (r, ll) = mixture.responsibilities(&feats);
            resp = r;
            if iteration > 0 && (ll - prev_ll).abs() <= cfg.tolerance * (1.0 + ll.abs()) {
                converged_at = Some(iteration);
                break;
            }
            prev_ll = ll;
            m_step(&mut mixture, &feats, &resp, cfg.covariance)?;
        }
        let Some(iterations) = converged_at else {
            return Err(RegimeError::Convergence {
                iterations: cfg.max_iterations,
            });
        };
        info!(iterations, n_regimes = k_count, "regime mixture converged");

        // Rank regimes by ascending portfolio-return variance so regime 0 is
        // always the calmest across refits.
        let aligned: Vec<f64> = portfolio_returns[cfg.lookback - 1..].to_vec();
        let order = variance_order(&aligned, &resp, k_count);
        permute_mixture(&mut mixture, &order);
        let resp = permute_resp(&resp, &order, k_count);

        let transition = estimate_transition(&resp, k_count, cfg.prob_floor);

        // Per-regime asset-space distributions from the aligned asset rows.
        let aligned_rows: Vec<f64> =
            series.values()[(cfg.lookback - 1) * n_assets..].to_vec();
        let mut regimes = Vec::with_capacity(k_count);
        for k in 0..k_count {
            let col: Vec<f64> = (0..m).map(|i| resp[i * k_count + k]).collect();
            let mean = stats::weighted_mean_rows(&aligned_rows, n_assets, &col);
            let covariance =
                stats::weighted_covariance_rows(&aligned_rows, n_assets, &col, 1e-12);
            let cholesky = stats::cholesky(&covariance, n_assets)?;
            regimes.push(RegimeParams {
                mean,
                covariance,
                cholesky,
            });
        }
        debug!(
            variances = ?regimes
                .iter()
                .map(|r| r.covariance[0])
                .collect::<Vec<_>>(),
            "per-regime asset variances (ranked)"
        );

        Ok(RegimeModel::from_parts(
            regimes,
            transition,
            cfg.prob_floor,
            n_assets,
            mixture,
        ))
    }
}

/// Deterministic initialization: sort observations by realized volatility
/// and seed component means from K contiguous quantile chunks. Covariances
/// start at identity (the features are standardized).
fn init_mixture(raw: &[f64], m: usize, k_count: usize, lookback: usize) -> FeatureMixture {
    let d = N_FEATURES;

    let mut feat_mean = vec![0.0; d];
    let mut feat_std = vec![0.0; d];
    for j in 0..d {
        let col: Vec<f64> = (0..m).map(|i| raw[i * d + j]).collect();
        feat_mean[j] = stats::mean(&col);
        feat_std[j] = stats::std_dev(&col).max(1e-12);
    }

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| {
        raw[a * d]
            .partial_cmp(&raw[b * d])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut means = vec![0.0; k_count * d];
    let chunk = m.div_ceil(k_count);
    for k in 0..k_count {
        let lo = k * chunk;
        let hi = ((k + 1) * chunk).min(m);
        let members = &order[lo..hi.max(lo + 1).min(m)];
        for &i in members {
            for j in 0..d {
                means[k * d + j] += (raw[i * d + j] - feat_mean[j]) / feat_std[j];
            }
        }
        let count = members.len().max(1) as f64;
        for j in 0..d {
            means[k * d + j] /= count;
        }
    }

    let mut chols = vec![0.0; k_count * d * d];
    for k in 0..k_count {
        for j in 0..d {
            chols[k * d * d + j * d + j] = 1.0;
        }
    }

    FeatureMixture {
        n_components: k_count,
        weights: vec![1.0 / k_count as f64; k_count],
        means,
        chols,
        log_dets: vec![0.0; k_count],
        feat_mean,
        feat_std,
        lookback,
    }
}

fn m_step(
    mixture: &mut FeatureMixture,
    feats: &[f64],
    resp: &[f64],
    covariance: CovarianceKind,
) -> Result<(), RegimeError> {
    let d = N_FEATURES;
    let k_count = mixture.n_components;
    let m = feats.len() / d;

    for k in 0..k_count {
        let col: Vec<f64> = (0..m).map(|i| resp[i * k_count + k]).collect();
        let nk: f64 = col.iter().sum();
        mixture.weights[k] = (nk / m as f64).max(1e-6);

        let mean = stats::weighted_mean_rows(feats, d, &col);
        mixture.means[k * d..(k + 1) * d].copy_from_slice(&mean);

        let mut cov = stats::weighted_covariance_rows(feats, d, &col, VAR_FLOOR);
        if covariance == CovarianceKind::Diagonal {
            for i in 0..d {
                for j in 0..d {
                    if i != j {
                        cov[i * d + j] = 0.0;
                    }
                }
            }
        }
        let chol = stats::cholesky(&cov, d)?;
        mixture.log_dets[k] = 2.0 * (0..d).map(|i| chol[i * d + i].ln()).sum::<f64>();
        mixture.chols[k * d * d..(k + 1) * d * d].copy_from_slice(&chol);
    }

    let total: f64 = mixture.weights.iter().sum();
    for w in mixture.weights.iter_mut() {
        *w /= total;
    }
    Ok(())
}

/// Responsibility-weighted portfolio-return variance per component, returned
/// as the ascending-variance component order.
fn variance_order(aligned: &[f64], resp: &[f64], k_count: usize) -> Vec<usize> {
    let mut variances = vec![0.0; k_count];
    for k in 0..k_count {
        let mut nk = 0.0;
        let mut mu = 0.0;
        for (i, &r) in aligned.iter().enumerate() {
            let w = resp[i * k_count + k];
            nk += w;
            mu += w * r;
        }
        if nk <= 0.0 {
            continue;
        }
        mu /= nk;
        let mut var = 0.0;
        for (i, &r) in aligned.iter().enumerate() {
            var += resp[i * k_count + k] * (r - mu) * (r - mu);
        }
        variances[k] = var / nk;
    }
    let mut order: Vec<usize> = (0..k_count).collect();
    order.sort_by(|&a, &b| {
        variances[a]
            .partial_cmp(&variances[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

fn permute_mixture(mixture: &mut FeatureMixture, order: &[usize]) {
    let d = N_FEATURES;
    let weights = mixture.weights.clone();
    let means = mixture.means.clone();
    let chols = mixture.chols.clone();
    let log_dets = mixture.log_dets.clone();
    for (new_k, &old_k) in order.iter().enumerate() {
        mixture.weights[new_k] = weights[old_k];
        mixture.log_dets[new_k] = log_dets[old_k];
        mixture.means[new_k * d..(new_k + 1) * d]
            .copy_from_slice(&means[old_k * d..(old_k + 1) * d]);
        mixture.chols[new_k * d * d..(new_k + 1) * d * d]
            .copy_from_slice(&chols[old_k * d * d..(old_k + 1) * d * d]);
    }
}

fn permute_resp(resp: &[f64], order: &[usize], k_count: usize) -> Vec<f64> {
    let m = resp.len() / k_count;
    let mut out = vec![0.0; resp.len()];
    for i in 0..m {
        for (new_k, &old_k) in order.iter().enumerate() {
            out[i * k_count + new_k] = resp[i * k_count + old_k];
        }
    }
    out
}

/// Transition matrix from the most-likely state sequence, Laplace-smoothed
/// and floored.
fn estimate_transition(resp: &[f64], k_count: usize, floor: f64) -> Vec<f64> {
    let m = resp.len() / k_count;
    let argmax = |i: usize| -> usize {
        let row = &resp[i * k_count..(i + 1) * k_count];
        row.iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(k, _)| k)
            .unwrap_or(0)
    };

    let mut counts = vec![1.0; k_count * k_count]; // Laplace smoothing
    let mut prev = argmax(0);
    for i in 1..m {
        let cur = argmax(i);
        counts[prev * k_count + cur] += 1.0;
        prev = cur;
    }

    for row in counts.chunks_exact_mut(k_count) {
        let total: f64 = row.iter().sum();
        for p in row.iter_mut() {
            *p = (*p / total).max(floor);
        }
        let total: f64 = row.iter().sum();
        for p in row.iter_mut() {
            *p /= total;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    /// Deterministic two-regime series: long calm stretches alternating with
    /// high-volatility stretches.
    fn two_regime_series(n: usize) -> ReturnSeries {
        let mut returns = Vec::with_capacity(n);
        let mut x = 0.4_f64;
        for t in 0..n {
            // xorshift-style scramble, deterministic and seedless
            x = (x * 997.0 + t as f64 * 0.613).sin();
            let calm = (t / 120) % 2 == 0;
            let scale = if calm { 0.004 } else { 0.03 };
            returns.push(x * scale);
        }
        ReturnSeries::from_single(dates(n), returns).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(RegimeClassifier::new(RegimeConfig::default()).is_ok());
        let bad = RegimeConfig {
            n_regimes: 1,
            ..Default::default()
        };
        assert!(matches!(
            RegimeClassifier::new(bad),
            Err(RegimeError::InvalidConfig(_))
        ));
        let bad_floor = RegimeConfig {
            prob_floor: 0.9,
            ..Default::default()
        };
        assert!(RegimeClassifier::new(bad_floor).is_err());
    }

    #[test]
    fn test_fit_rejects_short_history() {
        let cfg = RegimeConfig::default();
        let needed = cfg.min_observations();
        let classifier = RegimeClassifier::new(cfg).unwrap();
        let series =
            ReturnSeries::from_single(dates(needed - 1), vec![0.01; needed - 1]).unwrap();
        assert!(matches!(
            classifier.fit(&series),
            Err(RegimeError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_fit_two_regimes_ranked_by_variance() {
        let cfg = RegimeConfig {
            n_regimes: 2,
            ..Default::default()
        };
        let classifier = RegimeClassifier::new(cfg).unwrap();
        let model = classifier.fit(&two_regime_series(1000)).unwrap();

        assert_eq!(model.n_regimes(), 2);
        // Regime 0 must be calmer than regime 1.
        let v0 = model.regimes()[0].covariance[0];
        let v1 = model.regimes()[1].covariance[0];
        assert!(v0 < v1, "v0={v0} v1={v1}");
    }

    #[test]
    fn test_transition_rows_sum_to_one() {
        let cfg = RegimeConfig {
            n_regimes: 2,
            ..Default::default()
        };
        let classifier = RegimeClassifier::new(cfg).unwrap();
        let model = classifier.fit(&two_regime_series(1000)).unwrap();
        for k in 0..model.n_regimes() {
            let row_sum: f64 = model.transition_row(k).iter().sum();
            approx::assert_relative_eq!(row_sum, 1.0, epsilon = 1e-12);
            assert!(model.transition_row(k).iter().all(|&p| p > 0.0));
        }
    }

    #[test]
    fn test_predict_proba_rows_normalized() {
        let cfg = RegimeConfig {
            n_regimes: 2,
            ..Default::default()
        };
        let classifier = RegimeClassifier::new(cfg).unwrap();
        let series = two_regime_series(800);
        let model = classifier.fit(&series).unwrap();
        let proba = model.predict_proba(&series).unwrap();
        for row in &proba {
            let sum: f64 = row.iter().sum();
            approx::assert_relative_eq!(sum, 1.0, epsilon = 1e-9);
            assert!(row.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn test_diagonal_covariance_fit() {
        let cfg = RegimeConfig {
            n_regimes: 2,
            covariance: CovarianceKind::Diagonal,
            ..Default::default()
        };
        let classifier = RegimeClassifier::new(cfg).unwrap();
        assert!(classifier.fit(&two_regime_series(800)).is_ok());
    }

    #[test]
    fn test_detect_regime_on_calm_window() {
        let cfg = RegimeConfig {
            n_regimes: 2,
            ..Default::default()
        };
        let classifier = RegimeClassifier::new(cfg).unwrap();
        let model = classifier.fit(&two_regime_series(1000)).unwrap();

        // A uniformly tiny-return window should land in the calm regime.
        let calm: Vec<f64> = (0..60).map(|t| 0.002 * ((t as f64) * 0.7).sin()).collect();
        let window = ReturnSeries::from_single(dates(60), calm).unwrap();
        let (regime, proba) = model.detect_regime(&window).unwrap();
        assert_eq!(regime, 0);
        approx::assert_relative_eq!(proba.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_convergence_budget_surfaced() {
        let cfg = RegimeConfig {
            n_regimes: 2,
            max_iterations: 1,
            tolerance: 1e-300,
            ..Default::default()
        };
        let classifier = RegimeClassifier::new(cfg).unwrap();
        assert!(matches!(
            classifier.fit(&two_regime_series(600)),
            Err(RegimeError::Convergence { iterations: 1 })
        ));
    }
}
