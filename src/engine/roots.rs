//! Scalar root finding.
//!
//! Two solvers cover the inversion needs of the model layer: Brent's
//! bracketing method for callers that can supply a sign-changing interval,
//! and a secant iteration for callers with only a starting point.

use crate::error::{ModelError, Result};

/// Options for the scalar root finders.
#[derive(Debug, Clone)]
pub struct RootConfig {
    /// Maximum number of iterations. Default: 100
    pub max_iterations: usize,

    /// Absolute tolerance on the root location. Default: 1e-12
    pub tol: f64,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tol: 1e-12,
        }
    }
}

/// Find a root of `f` in the bracketing interval `[a, b]` using Brent's
/// method.
///
/// Fails with a computation error if `f(a)` and `f(b)` do not differ in
/// sign, and with a convergence error if the iteration limit is reached.
pub fn brentq<F>(f: F, a: f64, b: f64, config: &RootConfig) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    let mut xa = a;
    let mut xb = b;
    let mut fa = f(xa)?;
    let mut fb = f(xb)?;

    if fa == 0.0 {
        return Ok(xa);
    }
    if fb == 0.0 {
        return Ok(xb);
    }
    if fa.signum() == fb.signum() {
        return Err(ModelError::Computation(format!(
            "no sign change on the interval [{}, {}]",
            a, b
        )));
    }

    let mut xc = xa;
    let mut fc = fa;
    let mut d = xb - xa;
    let mut e = d;

    for _ in 0..config.max_iterations {
        if fb.signum() == fc.signum() {
            xc = xa;
            fc = fa;
            d = xb - xa;
            e = d;
        }
        if fc.abs() < fb.abs() {
            xa = xb;
            xb = xc;
            xc = xa;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * f64::EPSILON * xb.abs() + 0.5 * config.tol;
        let xm = 0.5 * (xc - xb);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Ok(xb);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            // Attempt inverse quadratic interpolation (secant if xa == xc)
            let s = fb / fa;
            let (mut p, mut q) = if xa == xc {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * q * (q - r) - (xb - xa) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();

            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        xa = xb;
        fa = fb;
        if d.abs() > tol1 {
            xb += d;
        } else {
            xb += tol1.copysign(xm);
        }
        fb = f(xb)?;
    }

    Err(ModelError::Convergence(format!(
        "root finder did not converge within {} iterations",
        config.max_iterations
    )))
}

/// Find a root of `f` near `x0` by secant iteration.
///
/// This mirrors derivative-free Newton iteration: the second point is
/// seeded from a small relative perturbation of `x0`.
pub fn newton<F>(f: F, x0: f64, config: &RootConfig) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    let mut p0 = x0;
    let mut p1 = if x0 != 0.0 { x0 * 1.0001 } else { 1e-4 };
    let mut f0 = f(p0)?;
    let mut f1 = f(p1)?;

    for _ in 0..config.max_iterations {
        if f1 == f0 {
            if (p1 - p0).abs() < config.tol {
                return Ok(0.5 * (p0 + p1));
            }
            return Err(ModelError::Convergence(
                "secant iteration stalled on a flat interval".to_string(),
            ));
        }

        let p2 = p1 - f1 * (p1 - p0) / (f1 - f0);
        if (p2 - p1).abs() < config.tol * p2.abs().max(1.0) {
            return Ok(p2);
        }

        p0 = p1;
        f0 = f1;
        p1 = p2;
        f1 = f(p1)?;
    }

    Err(ModelError::Convergence(format!(
        "secant iteration did not converge within {} iterations",
        config.max_iterations
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_brentq_cubic() {
        let f = |x: f64| -> Result<f64> { Ok(x * x * x - 2.0 * x - 5.0) };
        let root = brentq(f, 2.0, 3.0, &RootConfig::default()).unwrap();
        assert_relative_eq!(root, 2.0945514815423265, epsilon = 1e-10);
    }

    #[test]
    fn test_brentq_requires_sign_change() {
        let f = |x: f64| -> Result<f64> { Ok(x * x + 1.0) };
        let err = brentq(f, -1.0, 1.0, &RootConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::Computation(_)));
    }

    #[test]
    fn test_newton_sqrt() {
        let f = |x: f64| -> Result<f64> { Ok(x * x - 2.0) };
        let root = newton(f, 1.0, &RootConfig::default()).unwrap();
        assert_relative_eq!(root, std::f64::consts::SQRT_2, epsilon = 1e-10);
    }
}
