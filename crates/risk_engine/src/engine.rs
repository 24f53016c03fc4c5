//! Parallel simulation fan-out.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{info, warn};

use risk_core::{stats, Portfolio};
use risk_models::{GarchModel, RegimeModel};
use risk_scenarios::ScenarioLibrary;

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::path::{NoRebalance, PathOutcome, PathSimulator, Rebalancer};
use crate::rng::PathRng;

/// Outcome of a completed run.
///
/// Only successful paths are stored, in path-index order; the failed count
/// is recorded separately. A run that breaches the failure ceiling returns
/// an error instead of a partial result.
#[derive(Clone, Debug)]
pub struct SimulationResult {
    paths: Vec<PathOutcome>,
    failed_paths: usize,
    master_seed: u64,
    horizon: usize,
    initial_value: f64,
}

impl SimulationResult {
    /// Assembles a result from externally produced paths (custom runners,
    /// test fixtures). The engine itself constructs results only for runs
    /// that stayed under the failure ceiling.
    pub fn new(
        paths: Vec<PathOutcome>,
        failed_paths: usize,
        master_seed: u64,
        horizon: usize,
        initial_value: f64,
    ) -> Self {
        Self {
            paths,
            failed_paths,
            master_seed,
            horizon,
            initial_value,
        }
    }

    /// Successful path outcomes in path-index order.
    #[inline]
    pub fn paths(&self) -> &[PathOutcome] {
        &self.paths
    }

    /// Number of paths that diverged and were discarded.
    #[inline]
    pub fn failed_paths(&self) -> usize {
        self.failed_paths
    }

    /// Master seed the run was produced with.
    #[inline]
    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Periods per path.
    #[inline]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Initial portfolio value shared by all paths.
    #[inline]
    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    /// Terminal portfolio values, one per successful path.
    pub fn terminal_values(&self) -> Vec<f64> {
        self.paths.iter().map(PathOutcome::terminal_value).collect()
    }

    /// Whole-path simple returns, one per successful path.
    pub fn path_returns(&self) -> Vec<f64> {
        self.paths.iter().map(PathOutcome::path_return).collect()
    }

    /// Fraction of paths frozen early by a trading bound.
    pub fn early_termination_rate(&self) -> f64 {
        if self.paths.is_empty() {
            return 0.0;
        }
        let early = self.paths.iter().filter(|p| p.terminated_early).count();
        early as f64 / self.paths.len() as f64
    }
}

/// Regime-aware Monte Carlo engine.
///
/// Construction precomputes, for every regime × scenario pair, the Cholesky
/// factor of the scenario-stressed regime correlation matrix, plus each
/// regime's per-asset volatility scale. `simulate` then fans paths out over
/// a fixed rayon pool; all shared inputs are read-only for the duration of
/// a run.
pub struct SimulationEngine {
    regime_model: RegimeModel,
    vol_models: Vec<GarchModel>,
    library: ScenarioLibrary,
    config: SimulationConfig,
    rebalancer: Box<dyn Rebalancer>,
    /// Indexed `regime × n_scenarios + scenario`.
    factors: Vec<Vec<f64>>,
    /// Indexed `regime × n_assets + asset`.
    regime_scale: Vec<f64>,
}

impl SimulationEngine {
    /// Builds an engine, validating input compatibility and precomputing
    /// the stressed correlation factors.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::IncompatibleInputs`] when the volatility model
    ///   count does not match the regime model's asset count
    /// - [`SimulationError::Data`] when a stressed covariance cannot be
    ///   factorized
    pub fn new(
        regime_model: RegimeModel,
        vol_models: Vec<GarchModel>,
        library: ScenarioLibrary,
        config: SimulationConfig,
    ) -> Result<Self, SimulationError> {
        let n_assets = regime_model.n_assets();
        if vol_models.len() != n_assets {
            return Err(SimulationError::IncompatibleInputs(format!(
                "{} volatility models for {} assets",
                vol_models.len(),
                n_assets
            )));
        }

        let (factors, regime_scale) = precompute_factors(&regime_model, &library)?;
        info!(
            n_regimes = regime_model.n_regimes(),
            n_scenarios = library.len(),
            n_assets,
            "simulation engine ready"
        );
        Ok(Self {
            regime_model,
            vol_models,
            library,
            config,
            rebalancer: Box::new(NoRebalance),
            factors,
            regime_scale,
        })
    }

    /// Replaces the rebalancing rule (builder style).
    pub fn with_rebalancer(mut self, rebalancer: Box<dyn Rebalancer>) -> Self {
        self.rebalancer = rebalancer;
        self
    }

    /// The run configuration.
    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs the full simulation.
    ///
    /// Per-path streams derive from the master seed and the path index, so
    /// a fixed seed reproduces the result bit-for-bit regardless of worker
    /// count, and growing `n_sims` never changes earlier paths.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::IncompatibleInputs`] for a weight-count mismatch
    ///   or out-of-range initial regime
    /// - [`SimulationError::ExcessiveFailureRate`] when the failed-path
    ///   fraction breaches the configured ceiling; the run aborts atomically
    ///   and exposes no partial result
    pub fn simulate(
        &self,
        portfolio: &Portfolio,
        initial_regime: usize,
    ) -> Result<SimulationResult, SimulationError> {
        let n_assets = self.regime_model.n_assets();
        if portfolio.weights.len() != n_assets {
            return Err(SimulationError::IncompatibleInputs(format!(
                "{} portfolio weights for {} assets",
                portfolio.weights.len(),
                n_assets
            )));
        }
        if initial_regime >= self.regime_model.n_regimes() {
            return Err(SimulationError::IncompatibleInputs(format!(
                "initial regime {} out of range (K = {})",
                initial_regime,
                self.regime_model.n_regimes()
            )));
        }

        let config = &self.config;
        let n_sims = config.n_sims();
        let max_failures = (config.failure_ceiling() * n_sims as f64).floor() as usize;

        let simulator = PathSimulator {
            regime_model: &self.regime_model,
            vol_models: &self.vol_models,
            library: &self.library,
            factors: &self.factors,
            regime_scale: &self.regime_scale,
            transaction_cost: config.transaction_cost(),
            horizon: config.horizon(),
            rebalancer: self.rebalancer.as_ref(),
        };

        let failures = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.effective_threads())
            .build()
            .map_err(|e| SimulationError::IncompatibleInputs(e.to_string()))?;

        let outcomes: Vec<Option<PathOutcome>> = pool.install(|| {
            (0..n_sims as u64)
                .into_par_iter()
                .map(|path_index| {
                    // Cooperative abort: stop doing work once the ceiling is
                    // known to be breached; results are discarded anyway.
                    if abort.load(Ordering::Relaxed) {
                        return None;
                    }
                    let mut rng = PathRng::for_path(config.master_seed(), path_index);
                    match simulator.simulate_path(portfolio, initial_regime, &mut rng) {
                        Ok(outcome) => Some(outcome),
                        Err(err) => {
                            let failed = failures.fetch_add(1, Ordering::Relaxed) + 1;
                            warn!(path_index, %err, "path failed");
                            if failed > max_failures {
                                abort.store(true, Ordering::Relaxed);
                            }
                            None
                        }
                    }
                })
                .collect()
        });

        let failed = failures.load(Ordering::Relaxed);
        if abort.load(Ordering::Relaxed) || failed > max_failures {
            return Err(SimulationError::ExcessiveFailureRate {
                failed,
                total: n_sims,
                ceiling: config.failure_ceiling(),
            });
        }

        let paths: Vec<PathOutcome> = outcomes.into_iter().flatten().collect();
        info!(
            n_paths = paths.len(),
            failed,
            seed = config.master_seed(),
            "simulation complete"
        );
        Ok(SimulationResult {
            paths,
            failed_paths: failed,
            master_seed: config.master_seed(),
            horizon: config.horizon(),
            initial_value: portfolio.value,
        })
    }
}

/// Builds the per-(regime, scenario) correlation Cholesky factors and the
/// per-regime volatility scales.
///
/// The regime covariance supplies the correlation structure and the
/// relative volatility level; the GARCH marginals supply the conditional
/// magnitude at simulation time. The scale for regime `k`, asset `j` is
/// `sqrt(Σ_k[j,j] / pooled_var_j)`, so calm regimes damp the conditional
/// vol and crisis regimes amplify it.
fn precompute_factors(
    regime_model: &RegimeModel,
    library: &ScenarioLibrary,
) -> Result<(Vec<Vec<f64>>, Vec<f64>), SimulationError> {
    let n_assets = regime_model.n_assets();
    let n_regimes = regime_model.n_regimes();
    let n_scenarios = library.len();

    // Pooled per-asset variance across regimes, weighted uniformly.
    let mut pooled = vec![0.0; n_assets];
    for params in regime_model.regimes() {
        for j in 0..n_assets {
            pooled[j] += params.covariance[j * n_assets + j] / n_regimes as f64;
        }
    }

    let mut regime_scale = vec![0.0; n_regimes * n_assets];
    let mut factors = Vec::with_capacity(n_regimes * n_scenarios);
    for (k, params) in regime_model.regimes().iter().enumerate() {
        for j in 0..n_assets {
            let var = params.covariance[j * n_assets + j];
            regime_scale[k * n_assets + j] = if pooled[j] > 0.0 {
                (var / pooled[j]).sqrt()
            } else {
                1.0
            };
        }
        let correlation = to_correlation(&params.covariance, n_assets);
        for scenario in library.scenarios() {
            let stressed = scenario.stressed_covariance(&correlation, n_assets);
            factors.push(stats::cholesky(&stressed, n_assets)?);
        }
    }
    Ok((factors, regime_scale))
}

/// Correlation matrix of a covariance matrix.
fn to_correlation(cov: &[f64], dim: usize) -> Vec<f64> {
    let mut out = vec![0.0; dim * dim];
    for i in 0..dim {
        for j in 0..dim {
            let denom = (cov[i * dim + i] * cov[j * dim + j]).sqrt();
            out[i * dim + j] = if denom > 0.0 {
                (cov[i * dim + j] / denom).clamp(-1.0, 1.0)
            } else if i == j {
                1.0
            } else {
                0.0
            };
        }
    }
    out
}
