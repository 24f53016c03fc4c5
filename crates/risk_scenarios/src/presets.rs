//! The standard historical stress catalog.
//!
//! Weights are unconditional per-period injection probabilities within the
//! catalog; the "base" entry carries the bulk of the mass so most periods
//! are unstressed. Shift magnitudes follow the historical episodes they are
//! named after (Black Monday's -23% single-day move being the anchor).

use crate::error::ScenarioError;
use crate::library::ScenarioLibrary;
use crate::scenario::Scenario;

/// The named entries of the standard catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StressPreset {
    /// No stress; unit multiplier, no shift.
    Base,
    /// October 1987 single-day crash.
    BlackMonday,
    /// 2008 global financial crisis conditions.
    Gfc2008,
    /// March 2020 COVID crash.
    CovidCrash,
    /// May 2010 flash crash.
    FlashCrash,
    /// Sharp rates repricing (2022-style).
    RatesShock,
}

impl StressPreset {
    /// All presets in catalog order.
    pub fn all() -> Vec<Self> {
        vec![
            Self::Base,
            Self::BlackMonday,
            Self::Gfc2008,
            Self::CovidCrash,
            Self::FlashCrash,
            Self::RatesShock,
        ]
    }

    /// Catalog name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::BlackMonday => "black_monday",
            Self::Gfc2008 => "gfc_2008",
            Self::CovidCrash => "covid_crash",
            Self::FlashCrash => "flash_crash",
            Self::RatesShock => "rates_shock",
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Base => "Normal market conditions",
            Self::BlackMonday => "October 1987 single-day crash (-23%)",
            Self::Gfc2008 => "2008 global financial crisis stress",
            Self::CovidCrash => "March 2020 pandemic crash",
            Self::FlashCrash => "May 2010 intraday liquidity collapse",
            Self::RatesShock => "Sharp rates repricing",
        }
    }

    /// Catalog weight of this entry.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Base => 0.70,
            Self::BlackMonday => 0.02,
            Self::Gfc2008 => 0.08,
            Self::CovidCrash => 0.08,
            Self::FlashCrash => 0.04,
            Self::RatesShock => 0.08,
        }
    }

    /// Full scenario definition.
    pub fn scenario(&self) -> Scenario {
        let (vol_multiplier, return_shift, correlation_shift) = match self {
            Self::Base => (1.0, 0.0, 0.0),
            Self::BlackMonday => (4.0, -0.23, 0.5),
            Self::Gfc2008 => (2.5, -0.04, 0.4),
            Self::CovidCrash => (2.8, -0.05, 0.45),
            Self::FlashCrash => (3.0, -0.07, 0.3),
            Self::RatesShock => (1.8, -0.02, 0.25),
        };
        Scenario {
            name: self.name().to_string(),
            weight: self.weight(),
            vol_multiplier,
            return_shift,
            correlation_shift,
        }
    }
}

impl ScenarioLibrary {
    /// The standard catalog: base plus the five historical stress entries.
    pub fn standard() -> Result<Self, ScenarioError> {
        Self::new(StressPreset::all().iter().map(StressPreset::scenario).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_catalog_constructs() {
        let lib = ScenarioLibrary::standard().unwrap();
        assert_eq!(lib.len(), 6);
        let sum: f64 = lib.scenarios().iter().map(|s| s.weight).sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_black_monday_shift() {
        let s = StressPreset::BlackMonday.scenario();
        assert_relative_eq!(s.return_shift, -0.23);
        assert!(s.vol_multiplier > 1.0);
        assert!(s.correlation_shift > 0.0);
    }

    #[test]
    fn test_base_dominates_catalog_mass() {
        let lib = ScenarioLibrary::standard().unwrap();
        let base = &lib.scenarios()[lib.index_of("base").unwrap()];
        assert!(base.is_neutral());
        assert!(base.weight >= 0.5);
    }

    #[test]
    fn test_preset_names_unique() {
        let mut names: Vec<&str> = StressPreset::all().iter().map(StressPreset::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 6);
    }
}
