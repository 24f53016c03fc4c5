//! Nelder-Mead downhill simplex, used by the GARCH maximum-likelihood fit.
//!
//! Constraint handling is delegated to the objective (return a large penalty
//! outside the feasible region); the simplex itself is unconstrained.

/// Result of a simplex minimization.
pub struct SimplexResult {
    /// Best parameter vector found.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub fx: f64,
    /// Whether the spread tolerance was met within the iteration budget.
    pub converged: bool,
    /// Iterations consumed.
    pub iterations: usize,
}

/// Minimizes `f` starting from `x0` with per-coordinate initial steps.
///
/// Standard coefficients: reflection 1, expansion 2, contraction 0.5,
/// shrink 0.5. Converges when the objective spread across the simplex falls
/// below `tol`.
pub fn nelder_mead<F>(
    f: F,
    x0: &[f64],
    initial_step: f64,
    tol: f64,
    max_iterations: usize,
) -> SimplexResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for i in 0..n {
        let mut v = x0.to_vec();
        let step = if v[i].abs() > 1e-8 {
            v[i].abs() * initial_step
        } else {
            initial_step * 1e-3
        };
        v[i] += step;
        simplex.push(v);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| f(v)).collect();

    let mut iterations = 0;
    let mut converged = false;
    while iterations < max_iterations {
        iterations += 1;

        // Order vertices by objective value.
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| {
            values[a]
                .partial_cmp(&values[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        if (values[worst] - values[best]).abs() <= tol * (1.0 + values[best].abs()) {
            converged = true;
            break;
        }

        // Centroid of all vertices except the worst.
        let mut centroid = vec![0.0; n];
        for (idx, v) in simplex.iter().enumerate() {
            if idx == worst {
                continue;
            }
            for (c, &x) in centroid.iter_mut().zip(v) {
                *c += x;
            }
        }
        for c in centroid.iter_mut() {
            *c /= n as f64;
        }

        let blend = |a: f64, b: f64, coeff: f64| a + coeff * (a - b);
        let reflect: Vec<f64> = centroid
            .iter()
            .zip(&simplex[worst])
            .map(|(&c, &w)| blend(c, w, 1.0))
            .collect();
        let f_reflect = f(&reflect);

        if f_reflect < values[best] {
            // Try expanding further in the same direction.
            let expand: Vec<f64> = centroid
                .iter()
                .zip(&simplex[worst])
                .map(|(&c, &w)| blend(c, w, 2.0))
                .collect();
            let f_expand = f(&expand);
            if f_expand < f_reflect {
                simplex[worst] = expand;
                values[worst] = f_expand;
            } else {
                simplex[worst] = reflect;
                values[worst] = f_reflect;
            }
        } else if f_reflect < values[second_worst] {
            simplex[worst] = reflect;
            values[worst] = f_reflect;
        } else {
            // Contract toward the centroid.
            let contract: Vec<f64> = centroid
                .iter()
                .zip(&simplex[worst])
                .map(|(&c, &w)| c + 0.5 * (w - c))
                .collect();
            let f_contract = f(&contract);
            if f_contract < values[worst] {
                simplex[worst] = contract;
                values[worst] = f_contract;
            } else {
                // Shrink all vertices toward the best.
                let best_vertex = simplex[best].clone();
                for (idx, v) in simplex.iter_mut().enumerate() {
                    if idx == best {
                        continue;
                    }
                    for (x, &b) in v.iter_mut().zip(&best_vertex) {
                        *x = b + 0.5 * (*x - b);
                    }
                    values[idx] = f(v);
                }
            }
        }
    }

    let (best_idx, _) = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or((0, &values[0]));
    SimplexResult {
        x: simplex[best_idx].clone(),
        fx: values[best_idx],
        converged,
        iterations,
    }
}
