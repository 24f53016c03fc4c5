//! Historical return series.
//!
//! [`ReturnSeries`] is the single input to model fitting. It is validated at
//! construction and read-only afterwards; fitted models are invalidated by
//! replacing them, never by mutating the series underneath them.

use chrono::NaiveDate;

use crate::error::DataError;

/// An ordered multi-asset history of simple per-period returns.
///
/// Storage is flat row-major `n_obs × n_assets`, one row per observation
/// date. The date index is strictly increasing with no duplicates; gaps are
/// the caller's concern (the upstream cleaning layer delivers a gap-free
/// series per the ingestion contract).
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    n_assets: usize,
}

impl ReturnSeries {
    /// Creates a validated multi-asset series.
    ///
    /// # Errors
    ///
    /// - [`DataError::Empty`] if there are no observations or no assets
    /// - [`DataError::LengthMismatch`] if `values.len() != dates.len() * n_assets`
    /// - [`DataError::NonFinite`] if any return is NaN or infinite
    /// - [`DataError::NonIncreasingDates`] if the date index is not strictly
    ///   increasing
    pub fn new(
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
        n_assets: usize,
    ) -> Result<Self, DataError> {
        if dates.is_empty() {
            return Err(DataError::Empty("dates"));
        }
        if n_assets == 0 {
            return Err(DataError::Empty("assets"));
        }
        if values.len() != dates.len() * n_assets {
            return Err(DataError::LengthMismatch {
                what: "return values",
                expected: dates.len() * n_assets,
                actual: values.len(),
            });
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(DataError::NonFinite(idx));
        }
        for t in 1..dates.len() {
            if dates[t] <= dates[t - 1] {
                return Err(DataError::NonIncreasingDates(t));
            }
        }
        Ok(Self {
            dates,
            values,
            n_assets,
        })
    }

    /// Creates a single-asset series.
    pub fn from_single(dates: Vec<NaiveDate>, returns: Vec<f64>) -> Result<Self, DataError> {
        Self::new(dates, returns, 1)
    }

    /// Number of observations.
    #[inline]
    pub fn n_obs(&self) -> usize {
        self.dates.len()
    }

    /// Number of assets.
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.n_assets
    }

    /// The date index.
    #[inline]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The full flat value buffer (`n_obs × n_assets`, row-major).
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns of all assets at observation `t`.
    #[inline]
    pub fn row(&self, t: usize) -> &[f64] {
        &self.values[t * self.n_assets..(t + 1) * self.n_assets]
    }

    /// Copies out the return history of asset `j`.
    pub fn asset_returns(&self, j: usize) -> Vec<f64> {
        (0..self.n_obs())
            .map(|t| self.values[t * self.n_assets + j])
            .collect()
    }

    /// Collapses the series to portfolio-level returns under fixed `weights`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::LengthMismatch`] if `weights.len() != n_assets`.
    pub fn portfolio_returns(&self, weights: &[f64]) -> Result<Vec<f64>, DataError> {
        if weights.len() != self.n_assets {
            return Err(DataError::LengthMismatch {
                what: "portfolio weights",
                expected: self.n_assets,
                actual: weights.len(),
            });
        }
        Ok((0..self.n_obs())
            .map(|t| {
                self.row(t)
                    .iter()
                    .zip(weights)
                    .map(|(&r, &w)| r * w)
                    .sum()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn test_new_valid_single_asset() {
        let s = ReturnSeries::from_single(dates(3), vec![0.01, -0.02, 0.005]).unwrap();
        assert_eq!(s.n_obs(), 3);
        assert_eq!(s.n_assets(), 1);
        assert_relative_eq!(s.row(1)[0], -0.02);
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let err = ReturnSeries::new(dates(3), vec![0.01, 0.02], 1).unwrap_err();
        assert!(matches!(err, DataError::LengthMismatch { .. }));
    }

    #[test]
    fn test_new_rejects_nan() {
        let err = ReturnSeries::from_single(dates(2), vec![0.01, f64::NAN]).unwrap_err();
        assert_eq!(err, DataError::NonFinite(1));
    }

    #[test]
    fn test_new_rejects_unordered_dates() {
        let mut ds = dates(3);
        ds.swap(1, 2);
        let err = ReturnSeries::new(ds, vec![0.0; 3], 1).unwrap_err();
        assert!(matches!(err, DataError::NonIncreasingDates(_)));
    }

    #[test]
    fn test_new_rejects_duplicate_dates() {
        let mut ds = dates(3);
        ds[2] = ds[1];
        let err = ReturnSeries::new(ds, vec![0.0; 3], 1).unwrap_err();
        assert!(matches!(err, DataError::NonIncreasingDates(2)));
    }

    #[test]
    fn test_asset_returns_and_rows() {
        let s = ReturnSeries::new(dates(2), vec![0.01, 0.02, 0.03, 0.04], 2).unwrap();
        assert_eq!(s.asset_returns(0), vec![0.01, 0.03]);
        assert_eq!(s.asset_returns(1), vec![0.02, 0.04]);
        assert_eq!(s.row(1), &[0.03, 0.04]);
    }

    #[test]
    fn test_portfolio_returns() {
        let s = ReturnSeries::new(dates(2), vec![0.01, 0.03, 0.02, 0.04], 2).unwrap();
        let pr = s.portfolio_returns(&[0.5, 0.5]).unwrap();
        assert_relative_eq!(pr[0], 0.02);
        assert_relative_eq!(pr[1], 0.03);
        assert!(s.portfolio_returns(&[1.0]).is_err());
    }
}
