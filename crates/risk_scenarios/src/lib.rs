//! # risk_scenarios (Scenario Layer)
//!
//! A fixed, weighted catalog of stress scenarios injected into simulated
//! paths. The catalog is stateless and read-only once constructed; all
//! randomness lives in the caller's RNG, so a given RNG state always
//! reproduces the same draw sequence.
//!
//! - [`Scenario`]: one stress entry (volatility multiplier, return shift,
//!   correlation shift, draw weight)
//! - [`ScenarioLibrary`]: validated catalog with weighted sampling
//! - [`StressPreset`]: the standard historical catalog (Black Monday, GFC,
//!   COVID, Flash Crash, rates shock) plus the no-stress base entry

mod error;
mod library;
mod presets;
mod scenario;

pub use error::ScenarioError;
pub use library::ScenarioLibrary;
pub use presets::StressPreset;
pub use scenario::Scenario;
