//! The per-path state machine.
//!
//! Each period: Markov regime step, correlated residual draw, GARCH
//! variance advance, scenario adjustment, value update with transaction
//! costs, then trading bounds. A breached stop-loss or take-profit freezes
//! the path (the frozen value is carried to the horizon, never liquidated
//! to zero). A non-finite intermediate aborts only the offending path.

use risk_core::{stats, Portfolio};
use risk_models::{GarchModel, GarchState, RegimeModel};
use risk_scenarios::ScenarioLibrary;

use crate::error::PathError;
use crate::rng::PathRng;

/// Per-period weight adjustment hook.
///
/// Implementations must be shareable across worker threads; the engine
/// calls them concurrently from many paths.
pub trait Rebalancer: Sync + Send {
    /// Target weights for `step`, or `None` to hold the current ones.
    fn target_weights(&self, step: usize, weights: &[f64], value: f64) -> Option<Vec<f64>>;
}

/// The default rule: never rebalance (`Δw = 0`).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRebalance;

impl Rebalancer for NoRebalance {
    fn target_weights(&self, _step: usize, _weights: &[f64], _value: f64) -> Option<Vec<f64>> {
        None
    }
}

/// Completed trajectory of a single path.
#[derive(Clone, Debug)]
pub struct PathOutcome {
    /// Portfolio values, `horizon + 1` entries starting at the initial value.
    pub values: Vec<f64>,
    /// Regime id drawn at each period.
    pub regimes: Vec<u16>,
    /// Scenario index drawn at each period.
    pub scenarios: Vec<u16>,
    /// Whether a trading bound froze the path before the horizon.
    pub terminated_early: bool,
    /// Step at which the path was frozen, if any.
    pub frozen_at: Option<usize>,
}

impl PathOutcome {
    /// Final portfolio value.
    #[inline]
    pub fn terminal_value(&self) -> f64 {
        *self.values.last().unwrap_or(&0.0)
    }

    /// Simple return over the whole path.
    #[inline]
    pub fn path_return(&self) -> f64 {
        let initial = self.values[0];
        (self.terminal_value() - initial) / initial
    }
}

/// Read-only view of everything a path needs; owned by the engine and
/// shared across worker threads.
pub struct PathSimulator<'a> {
    pub(crate) regime_model: &'a RegimeModel,
    pub(crate) vol_models: &'a [GarchModel],
    pub(crate) library: &'a ScenarioLibrary,
    /// Correlation Cholesky factors, indexed `regime × n_scenarios + scenario`,
    /// each a flat `n_assets²` lower factor of the scenario-stressed regime
    /// correlation matrix.
    pub(crate) factors: &'a [Vec<f64>],
    /// Per-regime, per-asset volatility scale relative to the pooled level,
    /// indexed `regime × n_assets + asset`.
    pub(crate) regime_scale: &'a [f64],
    pub(crate) transaction_cost: f64,
    pub(crate) horizon: usize,
    pub(crate) rebalancer: &'a dyn Rebalancer,
}

impl PathSimulator<'_> {
    /// Runs one full path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NumericDivergence`] if any intermediate value
    /// is non-finite; the caller records the failure and moves on.
    pub fn simulate_path(
        &self,
        portfolio: &Portfolio,
        initial_regime: usize,
        rng: &mut PathRng,
    ) -> Result<PathOutcome, PathError> {
        let n_assets = self.regime_model.n_assets();
        let n_scenarios = self.library.len();
        let horizon = self.horizon;

        let mut values = Vec::with_capacity(horizon + 1);
        values.push(portfolio.value);
        let mut regimes = Vec::with_capacity(horizon);
        let mut scenarios = Vec::with_capacity(horizon);

        let mut weights = portfolio.weights.clone();
        let bounds = portfolio.bounds;
        // The leverage bound applies to the starting weights too, not just
        // rebalancer output.
        if let Some(max_leverage) = bounds.max_leverage {
            cap_gross_exposure(&mut weights, max_leverage);
        }
        let initial_value = portfolio.value;
        let stop_level = bounds.stop_loss.map(|f| initial_value * f);
        let profit_level = bounds.take_profit.map(|f| initial_value * f);

        // Each path owns its variance states, seeded at the stationary
        // distribution.
        let mut garch_states: Vec<GarchState> = self
            .vol_models
            .iter()
            .map(GarchState::stationary)
            .collect();
        let mut prev_residuals = vec![0.0; n_assets];

        let mut regime = initial_regime;
        let mut value = initial_value;
        let mut terminated_early = false;
        let mut frozen_at = None;

        let mut raw = vec![0.0; n_assets];
        let mut correlated = vec![0.0; n_assets];

        for step in 0..horizon {
            // 1. Markov regime step.
            regime = rng.categorical(self.regime_model.transition_row(regime));
            // 2. Scenario draw (the base entry carries the unstressed mass).
            let (scenario_idx, scenario) = self.library.sample(rng.rng_mut());
            regimes.push(regime as u16);
            scenarios.push(scenario_idx as u16);

            // 3. Correlated unit-variance residual vector under the
            //    scenario-stressed regime correlation.
            for (z, model) in raw.iter_mut().zip(self.vol_models) {
                *z = rng.innovation(model.innovation());
            }
            let factor = &self.factors[regime * n_scenarios + scenario_idx];
            stats::lower_triangular_mul(factor, n_assets, &raw, &mut correlated);

            // 4. Advance each marginal variance recursion and build asset
            //    returns from the regime's mean and conditional vol.
            let params = &self.regime_model.regimes()[regime];
            let mut portfolio_return = 0.0;
            for j in 0..n_assets {
                let variance = self.vol_models[j].step(&mut garch_states[j], prev_residuals[j]);
                let sigma = variance.sqrt() * self.regime_scale[regime * n_assets + j];
                let residual = sigma * correlated[j];
                prev_residuals[j] = residual;
                portfolio_return += weights[j] * (params.mean[j] + residual);
            }

            // 5. Scenario adjustment on the portfolio return.
            let adjusted = scenario.apply(portfolio_return);

            // 6. Rebalancing and transaction costs.
            let mut turnover = 0.0;
            if let Some(mut target) = self.rebalancer.target_weights(step, &weights, value) {
                if let Some(max_leverage) = bounds.max_leverage {
                    cap_gross_exposure(&mut target, max_leverage);
                }
                turnover = weights
                    .iter()
                    .zip(&target)
                    .map(|(w, t)| (w - t).abs())
                    .sum();
                weights = target;
            }

            value *= 1.0 + adjusted - self.transaction_cost * turnover;
            if !value.is_finite() {
                return Err(PathError::NumericDivergence { step });
            }
            values.push(value);

            // 7. Trading bounds: freeze, never liquidate.
            let stopped = stop_level.is_some_and(|level| value <= level);
            let profited = profit_level.is_some_and(|level| value >= level);
            if stopped || profited {
                terminated_early = true;
                frozen_at = Some(step);
                break;
            }
        }

        if terminated_early {
            // Carry the frozen value to the horizon; bookkeeping columns
            // repeat the last drawn ids.
            let last_regime = *regimes.last().unwrap_or(&0);
            let last_scenario = *scenarios.last().unwrap_or(&0);
            while values.len() < horizon + 1 {
                values.push(value);
                regimes.push(last_regime);
                scenarios.push(last_scenario);
            }
        }

        Ok(PathOutcome {
            values,
            regimes,
            scenarios,
            terminated_early,
            frozen_at,
        })
    }
}

/// Rescales weights proportionally so `Σ|w| <= max_leverage`.
fn cap_gross_exposure(weights: &mut [f64], max_leverage: f64) {
    let gross: f64 = weights.iter().map(|w| w.abs()).sum();
    if gross > max_leverage && gross > 0.0 {
        let scale = max_leverage / gross;
        for w in weights.iter_mut() {
            *w *= scale;
        }
    }
}
