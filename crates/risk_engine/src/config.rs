//! Simulation run configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum number of simulation paths allowed.
pub const MAX_SIMS: usize = 10_000_000;

/// Maximum horizon (periods per path) allowed.
pub const MAX_HORIZON: usize = 10_000;

/// Immutable run parameters. Use [`SimulationConfig::builder`] to construct
/// instances.
///
/// # Examples
///
/// ```rust
/// use risk_engine::SimulationConfig;
///
/// let config = SimulationConfig::builder()
///     .n_sims(50_000)
///     .horizon(252)
///     .master_seed(42)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.n_sims(), 50_000);
/// assert_eq!(config.horizon(), 252);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    n_sims: usize,
    horizon: usize,
    master_seed: u64,
    transaction_cost: f64,
    failure_ceiling: f64,
    n_threads: Option<usize>,
}

impl SimulationConfig {
    /// Creates a configuration builder with defaults.
    #[inline]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Number of simulated paths.
    #[inline]
    pub fn n_sims(&self) -> usize {
        self.n_sims
    }

    /// Periods per path.
    #[inline]
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Master seed all per-path streams derive from.
    #[inline]
    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Proportional transaction cost rate `c` in `c · |Δw|`.
    #[inline]
    pub fn transaction_cost(&self) -> f64 {
        self.transaction_cost
    }

    /// Maximum tolerated fraction of failed paths.
    #[inline]
    pub fn failure_ceiling(&self) -> f64 {
        self.failure_ceiling
    }

    /// Worker thread count; `None` uses all available cores.
    #[inline]
    pub fn n_threads(&self) -> Option<usize> {
        self.n_threads
    }

    /// Effective worker count.
    #[inline]
    pub fn effective_threads(&self) -> usize {
        self.n_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Builder for [`SimulationConfig`].
#[derive(Clone, Debug)]
pub struct SimulationConfigBuilder {
    n_sims: usize,
    horizon: usize,
    master_seed: u64,
    transaction_cost: f64,
    failure_ceiling: f64,
    n_threads: Option<usize>,
}

impl Default for SimulationConfigBuilder {
    fn default() -> Self {
        Self {
            n_sims: 10_000,
            horizon: 252,
            master_seed: 0,
            transaction_cost: 0.0,
            failure_ceiling: 0.01,
            n_threads: None,
        }
    }
}

impl SimulationConfigBuilder {
    /// Sets the number of paths.
    pub fn n_sims(mut self, n_sims: usize) -> Self {
        self.n_sims = n_sims;
        self
    }

    /// Sets the horizon in periods.
    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Sets the master seed.
    pub fn master_seed(mut self, seed: u64) -> Self {
        self.master_seed = seed;
        self
    }

    /// Sets the proportional transaction cost rate.
    pub fn transaction_cost(mut self, rate: f64) -> Self {
        self.transaction_cost = rate;
        self
    }

    /// Sets the failed-path fraction ceiling.
    pub fn failure_ceiling(mut self, ceiling: f64) -> Self {
        self.failure_ceiling = ceiling;
        self
    }

    /// Pins the worker thread count.
    pub fn n_threads(mut self, threads: usize) -> Self {
        self.n_threads = Some(threads);
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] for out-of-range values.
    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        if self.n_sims == 0 || self.n_sims > MAX_SIMS {
            return Err(ConfigError::InvalidParameter {
                name: "n_sims",
                value: format!("{} not in [1, {MAX_SIMS}]", self.n_sims),
            });
        }
        if self.horizon == 0 || self.horizon > MAX_HORIZON {
            return Err(ConfigError::InvalidParameter {
                name: "horizon",
                value: format!("{} not in [1, {MAX_HORIZON}]", self.horizon),
            });
        }
        if !(0.0..=0.1).contains(&self.transaction_cost) {
            return Err(ConfigError::InvalidParameter {
                name: "transaction_cost",
                value: format!("{} not in [0, 0.1]", self.transaction_cost),
            });
        }
        if !(0.0..=1.0).contains(&self.failure_ceiling) {
            return Err(ConfigError::InvalidParameter {
                name: "failure_ceiling",
                value: format!("{} not in [0, 1]", self.failure_ceiling),
            });
        }
        if self.n_threads == Some(0) {
            return Err(ConfigError::InvalidParameter {
                name: "n_threads",
                value: "0".to_string(),
            });
        }
        Ok(SimulationConfig {
            n_sims: self.n_sims,
            horizon: self.horizon,
            master_seed: self.master_seed,
            transaction_cost: self.transaction_cost,
            failure_ceiling: self.failure_ceiling,
            n_threads: self.n_threads,
        })
    }
}
