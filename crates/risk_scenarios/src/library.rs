//! Validated catalog with weighted sampling.

use rand::Rng;

use crate::error::ScenarioError;
use crate::scenario::Scenario;

/// Tolerance on the catalog weight sum.
const WEIGHT_TOL: f64 = 1e-6;

/// A read-only, weight-validated scenario catalog.
///
/// Sampling is a weighted draw over the entries; the library holds no RNG
/// state of its own, so the same RNG state always yields the same sequence.
#[derive(Clone, Debug)]
pub struct ScenarioLibrary {
    scenarios: Vec<Scenario>,
    /// Cumulative weights for inverse-CDF sampling.
    cumulative: Vec<f64>,
}

impl ScenarioLibrary {
    /// Builds a catalog, validating each entry and the weight sum.
    ///
    /// # Errors
    ///
    /// - [`ScenarioError::Empty`] for no entries
    /// - [`ScenarioError::InvalidField`] for an out-of-range entry
    /// - [`ScenarioError::InvalidWeights`] when weights do not sum to
    ///   1 ± 1e-6; never silently renormalized
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self, ScenarioError> {
        if scenarios.is_empty() {
            return Err(ScenarioError::Empty);
        }
        for s in &scenarios {
            s.validate()?;
        }
        let sum: f64 = scenarios.iter().map(|s| s.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_TOL {
            return Err(ScenarioError::InvalidWeights { sum });
        }
        let mut cumulative = Vec::with_capacity(scenarios.len());
        let mut acc = 0.0;
        for s in &scenarios {
            acc += s.weight;
            cumulative.push(acc);
        }
        // Guard the last bucket against float round-off.
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }
        Ok(Self {
            scenarios,
            cumulative,
        })
    }

    /// Builds a catalog from a stress sub-catalog and a per-period
    /// injection probability.
    ///
    /// The stress entries' weights are treated as relative proportions and
    /// rescaled to sum to `injection_probability`; a neutral base entry
    /// carrying the remaining `1 − injection_probability` mass is
    /// prepended, so each simulated period draws a stress with exactly the
    /// requested probability.
    ///
    /// # Errors
    ///
    /// - [`ScenarioError::InvalidInjectionProbability`] for a probability
    ///   outside `[0, 1)`
    /// - [`ScenarioError::Empty`] for no stress entries
    /// - [`ScenarioError::InvalidWeights`] when the stress weights do not
    ///   sum to a positive finite total
    /// - [`ScenarioError::InvalidField`] for an out-of-range entry
    pub fn with_injection_probability(
        injection_probability: f64,
        stresses: Vec<Scenario>,
    ) -> Result<Self, ScenarioError> {
        if !(0.0..1.0).contains(&injection_probability) {
            return Err(ScenarioError::InvalidInjectionProbability {
                value: injection_probability,
            });
        }
        if stresses.is_empty() {
            return Err(ScenarioError::Empty);
        }
        let total: f64 = stresses.iter().map(|s| s.weight).sum();
        if !(total > 0.0 && total.is_finite()) {
            return Err(ScenarioError::InvalidWeights { sum: total });
        }
        let mut scenarios = Vec::with_capacity(stresses.len() + 1);
        scenarios.push(Scenario::base(1.0 - injection_probability));
        for mut s in stresses {
            s.weight = s.weight * injection_probability / total;
            scenarios.push(s);
        }
        Self::new(scenarios)
    }

    /// Catalog entries in construction order.
    #[inline]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the catalog is empty (never true for a constructed library).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Index of the entry named `name`, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.scenarios.iter().position(|s| s.name == name)
    }

    /// Weighted draw. Deterministic given the RNG state.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (usize, &Scenario) {
        let u: f64 = rng.gen();
        let idx = self
            .cumulative
            .partition_point(|&c| c < u)
            .min(self.scenarios.len() - 1);
        (idx, &self.scenarios[idx])
    }
}
