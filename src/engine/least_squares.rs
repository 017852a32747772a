//! Levenberg-Marquardt least-squares solver.
//!
//! This module implements the least-squares capability consumed by the
//! model fitting layer: given a residual function and a starting point,
//! find the parameter vector minimizing the sum of squared residuals.
//! The Jacobian is approximated by forward finite differences and the
//! damped normal equations are solved with a Cholesky decomposition.

use crate::error::{ModelError, Result};
use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::{Array1, Array2};

/// Configuration options for the least-squares solver.
#[derive(Debug, Clone)]
pub struct LeastSquaresConfig {
    /// Maximum number of iterations. Default: 200
    pub max_iterations: usize,

    /// Tolerance for relative change in cost. Default: 1e-10
    pub ftol: f64,

    /// Tolerance for change in parameter values. Default: 1e-10
    pub xtol: f64,

    /// Tolerance for the gradient infinity norm. Default: 1e-10
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda on a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda on an accepted step. Default: 0.1
    pub lambda_down_factor: f64,

    /// Maximum value for lambda before giving up on an iteration. Default: 1e12
    pub max_lambda: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Relative step size for the finite-difference Jacobian. Default: 1e-8
    pub fd_epsilon: f64,
}

impl Default for LeastSquaresConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            max_lambda: 1e12,
            min_lambda: 1e-12,
            fd_epsilon: 1e-8,
        }
    }
}

/// Result of a least-squares solve.
#[derive(Debug, Clone)]
pub struct LeastSquaresResult {
    /// The best parameter vector found
    pub params: Array1<f64>,

    /// Sum of squared residuals at the solution
    pub cost: f64,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Number of iterations performed
    pub iterations: usize,

    /// Whether a convergence criterion was met
    pub success: bool,

    /// A message describing how the solve ended
    pub message: String,
}

/// Minimize the sum of squared residuals starting from `x0`.
///
/// `residuals` maps a parameter vector to the residual vector. Evaluation
/// errors abort the solve and propagate to the caller.
pub fn solve<F>(
    residuals: F,
    x0: &Array1<f64>,
    config: &LeastSquaresConfig,
) -> Result<LeastSquaresResult>
where
    F: Fn(&Array1<f64>) -> Result<Array1<f64>>,
{
    let n = x0.len();
    let mut x = x0.clone();
    let mut r = residuals(&x)?;
    let mut cost = r.dot(&r);

    if n == 0 {
        return Ok(LeastSquaresResult {
            params: x,
            cost,
            residuals: r,
            iterations: 0,
            success: true,
            message: "no free parameters".to_string(),
        });
    }

    let mut lambda = config.initial_lambda;
    let mut message = "maximum iterations reached".to_string();
    let mut success = false;
    let mut iterations = 0;

    for iter in 0..config.max_iterations {
        iterations = iter + 1;

        let jac = jacobian(&residuals, &x, &r, config.fd_epsilon)?;
        let (jtj, jtr) = normal_equations(&jac, &r);

        let grad_norm = jtr.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if grad_norm < config.gtol {
            success = true;
            message = "gradient tolerance reached".to_string();
            break;
        }

        // Inner loop: adjust damping until a step reduces the cost
        let mut stepped = false;
        while lambda <= config.max_lambda {
            let step = match solve_damped(&jtj, &jtr, lambda) {
                Some(s) => s,
                None => {
                    lambda *= config.lambda_up_factor;
                    continue;
                }
            };

            let x_new = &x + &step;
            let r_new = residuals(&x_new)?;
            let cost_new = r_new.dot(&r_new);

            if cost_new < cost {
                let step_norm = step.dot(&step).sqrt();
                let x_norm = x.dot(&x).sqrt();
                let reduction = cost - cost_new;

                x = x_new;
                r = r_new;
                cost = cost_new;
                lambda = (lambda * config.lambda_down_factor).max(config.min_lambda);
                stepped = true;

                if reduction <= config.ftol * cost.max(1e-30) {
                    success = true;
                    message = "cost tolerance reached".to_string();
                } else if step_norm <= config.xtol * (x_norm + config.xtol) {
                    success = true;
                    message = "step tolerance reached".to_string();
                }
                break;
            }

            lambda *= config.lambda_up_factor;
        }

        if !stepped {
            message = "damping parameter overflow without cost reduction".to_string();
            break;
        }
        if success {
            break;
        }
    }

    Ok(LeastSquaresResult {
        params: x,
        cost,
        residuals: r,
        iterations,
        success,
        message,
    })
}

/// Forward-difference Jacobian of the residual function at `x`, reusing the
/// already-computed residuals `r0`.
fn jacobian<F>(residuals: &F, x: &Array1<f64>, r0: &Array1<f64>, epsilon: f64) -> Result<Array2<f64>>
where
    F: Fn(&Array1<f64>) -> Result<Array1<f64>>,
{
    let m = r0.len();
    let n = x.len();
    let mut jac = Array2::zeros((m, n));

    for j in 0..n {
        let h = epsilon * x[j].abs().max(1.0);
        let mut xj = x.clone();
        xj[j] += h;
        let rj = residuals(&xj)?;
        if rj.len() != m {
            return Err(ModelError::ShapeMismatch(format!(
                "residual length changed during differentiation: {} vs {}",
                rj.len(),
                m
            )));
        }
        for i in 0..m {
            jac[[i, j]] = (rj[i] - r0[i]) / h;
        }
    }

    Ok(jac)
}

/// Compute J^T J and J^T r.
fn normal_equations(jac: &Array2<f64>, r: &Array1<f64>) -> (Array2<f64>, Array1<f64>) {
    let (m, n) = jac.dim();
    let mut jtj = Array2::zeros((n, n));
    let mut jtr = Array1::zeros(n);

    for a in 0..n {
        for b in a..n {
            let mut s = 0.0;
            for i in 0..m {
                s += jac[[i, a]] * jac[[i, b]];
            }
            jtj[[a, b]] = s;
            jtj[[b, a]] = s;
        }
        let mut s = 0.0;
        for i in 0..m {
            s += jac[[i, a]] * r[i];
        }
        jtr[a] = s;
    }

    (jtj, jtr)
}

/// Solve (J^T J + lambda * diag(J^T J)) step = -J^T r via Cholesky.
///
/// Returns `None` if the damped matrix is not positive definite, in which
/// case the caller increases the damping and retries.
fn solve_damped(jtj: &Array2<f64>, jtr: &Array1<f64>, lambda: f64) -> Option<Array1<f64>> {
    let n = jtr.len();
    let mut a = DMatrix::from_fn(n, n, |i, j| jtj[[i, j]]);
    for i in 0..n {
        let d = jtj[[i, i]].max(1e-12);
        a[(i, i)] += lambda * d;
    }
    let b = DVector::from_fn(n, |i, _| -jtr[i]);

    let chol = Cholesky::new(a)?;
    let s = chol.solve(&b);
    Some(Array1::from_iter(s.iter().copied()))
}
