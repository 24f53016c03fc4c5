//! Portfolio state and trading bounds.

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Optional risk bounds applied during path simulation.
///
/// - `stop_loss`: floor as a fraction of initial value; once the portfolio
///   value drops to or below `stop_loss × initial_value` the path terminates
///   early and the value is frozen (not liquidated to zero).
/// - `take_profit`: cap as a fraction of initial value, same freeze policy.
/// - `max_leverage`: cap on gross exposure `Σ|w|`; weights breaching it are
///   rescaled proportionally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TradingBounds {
    /// Stop-loss floor as a fraction of initial value (e.g. 0.85).
    pub stop_loss: Option<f64>,
    /// Take-profit cap as a fraction of initial value (e.g. 1.50).
    pub take_profit: Option<f64>,
    /// Maximum gross exposure (e.g. 2.0 for 2x leverage).
    pub max_leverage: Option<f64>,
}

impl TradingBounds {
    /// Validates bound values.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidParameter`] if `stop_loss` is outside
    /// (0, 1), `take_profit` is not > 1, or `max_leverage` is not positive.
    pub fn validate(&self) -> Result<(), DataError> {
        if let Some(sl) = self.stop_loss {
            if !(sl > 0.0 && sl < 1.0) {
                return Err(DataError::InvalidParameter {
                    name: "stop_loss",
                    value: format!("{sl} not in (0, 1)"),
                });
            }
        }
        if let Some(tp) = self.take_profit {
            if !(tp > 1.0 && tp.is_finite()) {
                return Err(DataError::InvalidParameter {
                    name: "take_profit",
                    value: format!("{tp} must be > 1"),
                });
            }
        }
        if let Some(lev) = self.max_leverage {
            if !(lev > 0.0 && lev.is_finite()) {
                return Err(DataError::InvalidParameter {
                    name: "max_leverage",
                    value: format!("{lev} must be positive"),
                });
            }
        }
        Ok(())
    }
}

/// Portfolio state for one simulated path.
///
/// One instance is cloned per path at path start and mutated once per
/// simulated period; it is never shared between paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Current portfolio value.
    pub value: f64,
    /// Current position weights, one per asset.
    pub weights: Vec<f64>,
    /// Optional stop-loss / take-profit / leverage bounds.
    pub bounds: TradingBounds,
}

impl Portfolio {
    /// Creates a portfolio with validated value and weights and no bounds.
    ///
    /// Weights may be long/short and need not sum to 1 (the residual is
    /// implicitly cash); gross exposure is capped later by `max_leverage`
    /// if configured.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if the value is not positive and finite, the
    /// weight vector is empty, or any weight is non-finite.
    pub fn new(value: f64, weights: Vec<f64>) -> Result<Self, DataError> {
        if !(value > 0.0 && value.is_finite()) {
            return Err(DataError::InvalidParameter {
                name: "value",
                value: format!("{value} must be positive and finite"),
            });
        }
        if weights.is_empty() {
            return Err(DataError::Empty("weights"));
        }
        if let Some(idx) = weights.iter().position(|w| !w.is_finite()) {
            return Err(DataError::NonFinite(idx));
        }
        Ok(Self {
            value,
            weights,
            bounds: TradingBounds::default(),
        })
    }

    /// Attaches trading bounds (builder style).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidParameter`] for out-of-range bounds.
    pub fn with_bounds(mut self, bounds: TradingBounds) -> Result<Self, DataError> {
        bounds.validate()?;
        self.bounds = bounds;
        Ok(self)
    }

    /// Gross exposure `Σ|w|`.
    #[inline]
    pub fn gross_exposure(&self) -> f64 {
        self.weights.iter().map(|w| w.abs()).sum()
    }

    /// Rescales weights so gross exposure respects `max_leverage`, if set.
    pub fn enforce_leverage(&mut self) {
        if let Some(cap) = self.bounds.max_leverage {
            let gross = self.gross_exposure();
            if gross > cap && gross > 0.0 {
                let scale = cap / gross;
                for w in self.weights.iter_mut() {
                    *w *= scale;
                }
            }
        }
    }
}
