//! Maximum-likelihood GARCH fitting.

use risk_core::stats;
use tracing::{debug, info};

use super::error::GarchError;
use super::model::{GarchModel, GarchSpec, GarchState};
use crate::optim::nelder_mead;

/// Penalty returned outside the feasible region; the simplex treats it as a
/// wall.
const PENALTY: f64 = 1e12;

/// Persistence ceiling inside the optimizer. Stationarity proper is
/// re-checked on the final parameters.
const MAX_PERSISTENCE: f64 = 0.9999;

impl GarchModel {
    /// Fits a GARCH(p,q) model to a return series by maximum likelihood.
    ///
    /// Pipeline: demean, winsorize residuals at `spec.winsor_z`,
    /// variance-targeting initialization, Nelder-Mead over
    /// `(ω, α₁..α_p, β₁..β_q)` with penalty walls at the stationarity
    /// boundary. With `spec.vol_target` set, the fitted model is rescaled to
    /// the target annualized volatility (repairing a boundary fit); without
    /// it, a non-stationary optimum is rejected.
    ///
    /// # Errors
    ///
    /// - [`GarchError::InsufficientData`] below [`GarchSpec::min_observations`]
    /// - [`GarchError::Convergence`] when the optimizer exhausts its budget
    /// - [`GarchError::NonPositiveVariance`] for a non-stationary fit with no
    ///   volatility target
    pub fn fit(spec: &GarchSpec, returns: &[f64]) -> Result<Self, GarchError> {
        spec.validate()?;
        let required = spec.min_observations();
        if returns.len() < required {
            return Err(GarchError::InsufficientData {
                required,
                actual: returns.len(),
            });
        }

        let mu = stats::mean(returns);
        let mut residuals: Vec<f64> = returns.iter().map(|r| r - mu).collect();
        let clamped = stats::winsorize(&mut residuals, spec.winsor_z);
        if clamped > 0 {
            debug!(clamped, z = spec.winsor_z, "winsorized outlier residuals");
        }
        let sample_var = stats::variance(&residuals).max(1e-12);

        // Variance-targeting start: modest ARCH mass, heavy GARCH mass,
        // intercept implied by the sample variance.
        let p = spec.p;
        let q = spec.q;
        let mut x0 = Vec::with_capacity(1 + p + q);
        let init_persistence = 0.98;
        x0.push(sample_var * (1.0 - init_persistence));
        x0.extend(std::iter::repeat(0.08 / p as f64).take(p));
        x0.extend(std::iter::repeat((init_persistence - 0.08) / q.max(1) as f64).take(q));

        let objective = |params: &[f64]| -> f64 {
            negative_log_likelihood(spec, params, &residuals, sample_var)
        };
        let result = nelder_mead(objective, &x0, 0.5, spec.tolerance, spec.max_iterations);
        if !result.converged {
            return Err(GarchError::Convergence {
                iterations: spec.max_iterations,
            });
        }

        let omega = result.x[0];
        let alpha = result.x[1..1 + p].to_vec();
        let beta = result.x[1 + p..].to_vec();
        let mut model = match GarchModel::new(omega, alpha, beta, spec.innovation) {
            Ok(model) => model,
            Err(err @ GarchError::NonPositiveVariance { .. }) => {
                // A boundary fit is only repairable under explicit targeting.
                if spec.vol_target.is_none() {
                    return Err(err);
                }
                let alpha = result.x[1..1 + p].to_vec();
                let beta = result.x[1 + p..].to_vec();
                repair_boundary_fit(omega, alpha, beta, spec)?
            }
            Err(err) => return Err(err),
        };
        if let Some(target) = spec.vol_target {
            model.rescale_to_target(target);
        }

        let terminal = run_recursion(&model, &residuals, sample_var);
        info!(
            omega = model.omega(),
            persistence = model.persistence(),
            unconditional_vol = model.unconditional_vol(),
            iterations = result.iterations,
            "GARCH fit complete"
        );
        Ok(model.with_terminal(terminal))
    }
}

/// Negative log-likelihood of the residual series under the recursion,
/// seeded at the sample variance.
fn negative_log_likelihood(
    spec: &GarchSpec,
    params: &[f64],
    residuals: &[f64],
    sample_var: f64,
) -> f64 {
    let p = spec.p;
    let q = spec.q;
    let omega = params[0];
    let alpha = &params[1..1 + p];
    let beta = &params[1 + p..];

    if omega <= 0.0 || params.iter().any(|&c| !c.is_finite()) {
        return PENALTY;
    }
    if alpha.iter().chain(beta).any(|&c| c < 0.0) {
        return PENALTY;
    }
    let persistence: f64 = alpha.iter().sum::<f64>() + beta.iter().sum::<f64>();
    if persistence >= MAX_PERSISTENCE {
        return PENALTY;
    }

    let warmup = p.max(q.max(1));
    let n = residuals.len();
    let mut variances = vec![sample_var; n];
    let mut nll = 0.0;
    for t in warmup..n {
        let mut v = omega;
        for (i, a) in alpha.iter().enumerate() {
            let r = residuals[t - 1 - i];
            v += a * r * r;
        }
        for (j, b) in beta.iter().enumerate() {
            v += b * variances[t - 1 - j];
        }
        if !(v > 0.0 && v.is_finite()) {
            return PENALTY;
        }
        variances[t] = v;
        let sigma = v.sqrt();
        nll -= spec.innovation.log_pdf(residuals[t] / sigma) - sigma.ln();
    }
    nll
}

/// Pulls a boundary (persistence >= 1) fit back under 1 before targeting.
fn repair_boundary_fit(
    omega: f64,
    mut alpha: Vec<f64>,
    mut beta: Vec<f64>,
    spec: &GarchSpec,
) -> Result<GarchModel, GarchError> {
    for c in alpha.iter_mut().chain(beta.iter_mut()) {
        *c = c.max(0.0);
    }
    let persistence: f64 = alpha.iter().sum::<f64>() + beta.iter().sum::<f64>();
    if persistence >= 1.0 {
        let shrink = 0.999 / persistence;
        for c in alpha.iter_mut().chain(beta.iter_mut()) {
            *c *= shrink;
        }
    }
    GarchModel::new(omega.max(1e-12), alpha, beta, spec.innovation)
}

/// Runs the fitted recursion over the full sample to obtain the terminal
/// state used to seed simulation paths.
fn run_recursion(model: &GarchModel, residuals: &[f64], sample_var: f64) -> GarchState {
    let mut state = GarchState {
        residuals: vec![0.0; model.p()],
        variances: vec![sample_var; model.q().max(1)],
    };
    for &r in residuals {
        model.step(&mut state, r);
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::garch::Innovation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, StandardNormal};

    /// Simulates a GARCH(1,1) series with known parameters.
    fn simulate_garch(n: usize, omega: f64, alpha: f64, beta: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut variance = omega / (1.0 - alpha - beta);
        let mut prev = 0.0_f64;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            variance = omega + alpha * prev * prev + beta * variance;
            let z: f64 = StandardNormal.sample(&mut rng);
            prev = variance.sqrt() * z;
            out.push(prev);
        }
        out
    }

    #[test]
    fn test_fit_rejects_short_history() {
        let spec = GarchSpec::default();
        let returns = vec![0.01; spec.min_observations() - 1];
        assert!(matches!(
            GarchModel::fit(&spec, &returns),
            Err(GarchError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_fit_recovers_persistence_region() {
        let returns = simulate_garch(3000, 2e-6, 0.08, 0.90, 42);
        let model = GarchModel::fit(&GarchSpec::default(), &returns).unwrap();

        assert!(model.omega() > 0.0);
        let persistence = model.persistence();
        assert!(
            (0.8..1.0).contains(&persistence),
            "persistence {persistence}"
        );
        // Long-run vol within a factor of two of the truth (1% daily).
        let vol = model.unconditional_vol();
        assert!((0.005..0.02).contains(&vol), "vol {vol}");
    }

    #[test]
    fn test_fit_with_student_t_innovations() {
        let returns = simulate_garch(2000, 2e-6, 0.08, 0.90, 7);
        let spec = GarchSpec {
            innovation: Innovation::StudentT { dof: 6.0 },
            ..Default::default()
        };
        let model = GarchModel::fit(&spec, &returns).unwrap();
        assert_eq!(model.innovation(), Innovation::StudentT { dof: 6.0 });
        assert!(model.persistence() < 1.0);
    }

    #[test]
    fn test_vol_target_hits_annualized_level() {
        let returns = simulate_garch(2000, 2e-6, 0.08, 0.90, 3);
        let spec = GarchSpec::with_default_target();
        let model = GarchModel::fit(&spec, &returns).unwrap();
        let annual = model.unconditional_vol() * crate::garch::PERIODS_PER_YEAR.sqrt();
        approx::assert_relative_eq!(annual, 0.12, epsilon = 1e-9);
    }

    #[test]
    fn test_fit_survives_single_crash_day() {
        let mut returns = simulate_garch(1500, 2e-6, 0.08, 0.90, 11);
        returns[700] = -0.23; // one Black-Monday-sized print
        let model = GarchModel::fit(&GarchSpec::default(), &returns).unwrap();
        // Winsorization keeps the fit stationary despite the outlier.
        assert!(model.persistence() < 1.0);
    }

    #[test]
    fn test_terminal_state_seeds_paths() {
        let returns = simulate_garch(2000, 2e-6, 0.08, 0.90, 5);
        let model = GarchModel::fit(&GarchSpec::default(), &returns).unwrap();
        let terminal = model.terminal_state();
        assert_eq!(terminal.residuals.len(), 1);
        assert!(terminal.variance() > 0.0);
    }
}
