//! # risk_engine (Simulation Layer)
//!
//! Regime-aware Monte Carlo path simulation. Fitted models (regime
//! classifier, per-asset GARCH marginals) and the scenario catalog are
//! read-only inputs; every simulated path carries its own RNG stream and
//! volatility state, so paths are embarrassingly parallel and a fixed
//! master seed reproduces results bit-for-bit regardless of scheduling.
//!
//! - [`SimulationConfig`]: validating builder for run parameters
//! - [`PathRng`]: per-path deterministic random stream
//! - [`PathSimulator`] / [`PathOutcome`]: the per-path state machine
//! - [`SimulationEngine`] / [`SimulationResult`]: the parallel fan-out
//! - [`Rebalancer`]: optional per-period weight adjustment hook

mod config;
mod engine;
mod error;
mod path;
mod rng;

pub use config::{SimulationConfig, SimulationConfigBuilder, MAX_HORIZON, MAX_SIMS};
pub use engine::{SimulationEngine, SimulationResult};
pub use error::{ConfigError, PathError, SimulationError};
pub use path::{NoRebalance, PathOutcome, PathSimulator, Rebalancer};
pub use rng::PathRng;
