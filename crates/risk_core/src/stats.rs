//! Descriptive statistics and small linear-algebra helpers.
//!
//! All matrix arguments use flat row-major `Vec<f64>` storage; dimensions are
//! passed explicitly. This keeps the simulation hot loops allocation-free and
//! cache-friendly.

use crate::error::DataError;

/// Arithmetic mean. Returns 0.0 for an empty slice.
#[inline]
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample variance (n − 1 denominator). Returns 0.0 for fewer than two points.
pub fn variance(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / (xs.len() - 1) as f64
}

/// Sample standard deviation.
#[inline]
pub fn std_dev(xs: &[f64]) -> f64 {
    variance(xs).sqrt()
}

/// Sample skewness (Fisher-Pearson, population moments).
///
/// Returns 0.0 for fewer than three points or zero dispersion, so a flat
/// window never poisons downstream feature matrices with NaN.
pub fn skewness(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n < 3 {
        return 0.0;
    }
    let m = mean(xs);
    let m2 = xs.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / n as f64;
    if m2 <= 0.0 {
        return 0.0;
    }
    let m3 = xs.iter().map(|&x| (x - m).powi(3)).sum::<f64>() / n as f64;
    m3 / m2.powf(1.5)
}

/// Excess kurtosis (population moments). Returns 0.0 on degenerate input.
pub fn excess_kurtosis(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n < 4 {
        return 0.0;
    }
    let m = mean(xs);
    let m2 = xs.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / n as f64;
    if m2 <= 0.0 {
        return 0.0;
    }
    let m4 = xs.iter().map(|&x| (x - m).powi(4)).sum::<f64>() / n as f64;
    m4 / (m2 * m2) - 3.0
}

/// Quantile of `xs` at probability `q` in [0, 1], linearly interpolated
/// between order statistics.
///
/// # Errors
///
/// Returns [`DataError::Empty`] for an empty slice and
/// [`DataError::InvalidParameter`] for `q` outside [0, 1].
pub fn quantile(xs: &[f64], q: f64) -> Result<f64, DataError> {
    if xs.is_empty() {
        return Err(DataError::Empty("quantile input"));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(DataError::InvalidParameter {
            name: "q",
            value: format!("{q} not in [0, 1]"),
        });
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Ok(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Ok(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
}

/// Weighted mean vector over row-major `data` (`n_obs × dim`).
///
/// `weights` must have one entry per observation; they are normalized
/// internally, so any non-negative weighting (e.g. regime responsibilities)
/// can be passed directly.
pub fn weighted_mean_rows(data: &[f64], dim: usize, weights: &[f64]) -> Vec<f64> {
    let n_obs = weights.len();
    let total: f64 = weights.iter().sum();
    let mut out = vec![0.0; dim];
    if total <= 0.0 || n_obs == 0 {
        return out;
    }
    for (t, &w) in weights.iter().enumerate() {
        let row = &data[t * dim..(t + 1) * dim];
        for (o, &x) in out.iter_mut().zip(row) {
            *o += w * x;
        }
    }
    for o in out.iter_mut() {
        *o /= total;
    }
    out
}

/// Weighted covariance matrix (`dim × dim`, row-major) over row-major `data`.
///
/// Uses normalized weights and the weighted-mean offset; diagonal entries are
/// floored at `var_floor` so downstream Cholesky factorization stays viable
/// even when a regime captures only near-identical observations.
pub fn weighted_covariance_rows(
    data: &[f64],
    dim: usize,
    weights: &[f64],
    var_floor: f64,
) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    let mu = weighted_mean_rows(data, dim, weights);
    let mut cov = vec![0.0; dim * dim];
    if total <= 0.0 {
        for i in 0..dim {
            cov[i * dim + i] = var_floor;
        }
        return cov;
    }
    for (t, &w) in weights.iter().enumerate() {
        let row = &data[t * dim..(t + 1) * dim];
        for i in 0..dim {
            let di = row[i] - mu[i];
            for j in i..dim {
                cov[i * dim + j] += w * di * (row[j] - mu[j]);
            }
        }
    }
    for i in 0..dim {
        for j in i..dim {
            let v = cov[i * dim + j] / total;
            cov[i * dim + j] = v;
            cov[j * dim + i] = v;
        }
    }
    for i in 0..dim {
        if cov[i * dim + i] < var_floor {
            cov[i * dim + i] = var_floor;
        }
    }
    cov
}

/// Lower-triangular Cholesky factor of a symmetric `dim × dim` matrix.
///
/// Retries with increasing diagonal jitter before giving up, since sample
/// covariance matrices from short regime windows are often borderline
/// semi-definite.
///
/// # Errors
///
/// Returns [`DataError::NotPositiveDefinite`] if factorization fails even
/// after jitter.
pub fn cholesky(matrix: &[f64], dim: usize) -> Result<Vec<f64>, DataError> {
    const JITTERS: [f64; 4] = [0.0, 1e-12, 1e-10, 1e-8];

    let mut last_err = DataError::NotPositiveDefinite { pivot: 0.0, row: 0 };
    for &jitter in &JITTERS {
        match try_cholesky(matrix, dim, jitter) {
            Ok(l) => return Ok(l),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

fn try_cholesky(matrix: &[f64], dim: usize, jitter: f64) -> Result<Vec<f64>, DataError> {
    let mut l = vec![0.0; dim * dim];
    for i in 0..dim {
        for j in 0..=i {
            let mut sum = matrix[i * dim + j];
            if i == j {
                sum += jitter;
            }
            for k in 0..j {
                sum -= l[i * dim + k] * l[j * dim + k];
            }
            if i == j {
                if sum <= 0.0 {
                    return Err(DataError::NotPositiveDefinite { pivot: sum, row: i });
                }
                l[i * dim + j] = sum.sqrt();
            } else {
                l[i * dim + j] = sum / l[j * dim + j];
            }
        }
    }
    Ok(l)
}

/// Multiplies a lower-triangular factor into a vector in place:
/// `out[i] = Σ_{j≤i} l[i][j] · z[j]`.
pub fn lower_triangular_mul(l: &[f64], dim: usize, z: &[f64], out: &mut [f64]) {
    for i in 0..dim {
        let mut acc = 0.0;
        for j in 0..=i {
            acc += l[i * dim + j] * z[j];
        }
        out[i] = acc;
    }
}

/// Clamps values beyond `z_threshold` sample standard deviations from the
/// mean. Returns the number of clamped observations.
pub fn winsorize(xs: &mut [f64], z_threshold: f64) -> usize {
    let m = mean(xs);
    let s = std_dev(xs);
    if s <= 0.0 || !z_threshold.is_finite() {
        return 0;
    }
    let lo = m - z_threshold * s;
    let hi = m + z_threshold * s;
    let mut clamped = 0;
    for x in xs.iter_mut() {
        if *x < lo {
            *x = lo;
            clamped += 1;
        } else if *x > hi {
            *x = hi;
            clamped += 1;
        }
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(mean(&xs), 3.0);
        assert_relative_eq!(variance(&xs), 2.5);
        assert_relative_eq!(std_dev(&xs), 2.5_f64.sqrt());
    }

    #[test]
    fn test_degenerate_moments() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[1.0]), 0.0);
        assert_eq!(skewness(&[2.0, 2.0, 2.0]), 0.0);
        assert_eq!(excess_kurtosis(&[1.0, 1.0, 1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_skewness_sign() {
        let right = [0.0, 0.0, 0.0, 0.0, 10.0];
        assert!(skewness(&right) > 0.0);
        let left = [0.0, 0.0, 0.0, 0.0, -10.0];
        assert!(skewness(&left) < 0.0);
    }

    #[test]
    fn test_quantile_interpolation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile(&xs, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile(&xs, 1.0).unwrap(), 4.0);
        assert_relative_eq!(quantile(&xs, 0.5).unwrap(), 2.5);
        // Unsorted input is sorted internally.
        let ys = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(quantile(&ys, 0.5).unwrap(), 2.5);
    }

    #[test]
    fn test_quantile_errors() {
        assert!(matches!(quantile(&[], 0.5), Err(DataError::Empty(_))));
        assert!(quantile(&[1.0], 1.5).is_err());
    }

    #[test]
    fn test_weighted_mean_rows() {
        // Two observations of two assets; all weight on the second row.
        let data = [1.0, 2.0, 3.0, 4.0];
        let mu = weighted_mean_rows(&data, 2, &[0.0, 1.0]);
        assert_relative_eq!(mu[0], 3.0);
        assert_relative_eq!(mu[1], 4.0);
    }

    #[test]
    fn test_weighted_covariance_symmetric() {
        let data = [0.01, 0.02, -0.01, -0.015, 0.005, 0.01, 0.02, 0.025];
        let w = [1.0; 4];
        let cov = weighted_covariance_rows(&data, 2, &w, 1e-12);
        assert_relative_eq!(cov[1], cov[2], epsilon = 1e-15);
        assert!(cov[0] > 0.0 && cov[3] > 0.0);
    }

    #[test]
    fn test_cholesky_roundtrip() {
        // A = [[4, 2], [2, 3]] has Cholesky [[2, 0], [1, sqrt(2)]].
        let a = [4.0, 2.0, 2.0, 3.0];
        let l = cholesky(&a, 2).unwrap();
        assert_relative_eq!(l[0], 2.0);
        assert_relative_eq!(l[2], 1.0);
        assert_relative_eq!(l[3], 2.0_f64.sqrt());
        assert_eq!(l[1], 0.0);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = [1.0, 2.0, 2.0, 1.0]; // eigenvalues 3, -1
        assert!(matches!(
            cholesky(&a, 2),
            Err(DataError::NotPositiveDefinite { .. })
        ));
    }

    #[test]
    fn test_lower_triangular_mul() {
        let l = [2.0, 0.0, 1.0, 3.0];
        let z = [1.0, 1.0];
        let mut out = [0.0; 2];
        lower_triangular_mul(&l, 2, &z, &mut out);
        assert_relative_eq!(out[0], 2.0);
        assert_relative_eq!(out[1], 4.0);
    }

    #[test]
    fn test_winsorize_clamps_outliers() {
        let mut xs = vec![0.0; 100];
        xs[0] = 100.0;
        let clamped = winsorize(&mut xs, 3.0);
        assert_eq!(clamped, 1);
        assert!(xs[0] < 100.0);
    }

    #[test]
    fn test_winsorize_flat_series_untouched() {
        let mut xs = vec![1.0; 10];
        assert_eq!(winsorize(&mut xs, 3.0), 0);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_quantile_stays_within_sample_range(
            xs in prop::collection::vec(-1.0f64..1.0, 1..64),
            q in 0.0f64..=1.0,
        ) {
            let v = quantile(&xs, q).unwrap();
            let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(v >= min - 1e-12);
            prop_assert!(v <= max + 1e-12);
        }

        #[test]
        fn prop_quantile_monotone_in_q(
            xs in prop::collection::vec(-1.0f64..1.0, 2..64),
            q1 in 0.0f64..=1.0,
            q2 in 0.0f64..=1.0,
        ) {
            let (lo, hi) = if q1 <= q2 { (q1, q2) } else { (q2, q1) };
            prop_assert!(quantile(&xs, lo).unwrap() <= quantile(&xs, hi).unwrap() + 1e-12);
        }

        #[test]
        fn prop_winsorize_never_widens_range(
            mut xs in prop::collection::vec(-10.0f64..10.0, 3..64),
            z in 0.5f64..5.0,
        ) {
            let before_min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
            let before_max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            winsorize(&mut xs, z);
            let after_min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
            let after_max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(after_min >= before_min - 1e-12);
            prop_assert!(after_max <= before_max + 1e-12);
        }

        #[test]
        fn prop_cholesky_reconstructs_gram_matrix(
            a in -2.0f64..2.0,
            b in -2.0f64..2.0,
            c in -2.0f64..2.0,
            d in -2.0f64..2.0,
        ) {
            // M Mᵀ + I is symmetric positive definite for any M.
            let m = [a, b, c, d];
            let mut g = [0.0; 4];
            for i in 0..2 {
                for j in 0..2 {
                    g[i * 2 + j] = m[i * 2] * m[j * 2] + m[i * 2 + 1] * m[j * 2 + 1];
                }
                g[i * 2 + i] += 1.0;
            }
            let l = cholesky(&g, 2).unwrap();
            for i in 0..2 {
                for j in 0..2 {
                    let mut acc = 0.0;
                    for k in 0..2 {
                        acc += l[i * 2 + k] * l[j * 2 + k];
                    }
                    prop_assert!((acc - g[i * 2 + j]).abs() < 1e-8);
                }
            }
        }
    }
}
