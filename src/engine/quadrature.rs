//! Definite-integral quadrature.
//!
//! The integration capability consumed by the model layer: adaptive
//! Simpson quadrature with an error estimate, fixed-order Gauss-Legendre
//! quadrature, Romberg extrapolation, and sampled trapezoid/Simpson rules
//! (plus the cumulative trapezoid used for sampled antiderivatives).

use crate::error::{ModelError, Result};
use ndarray::Array1;

/// Options for the adaptive and Romberg integrators.
#[derive(Debug, Clone)]
pub struct QuadConfig {
    /// Absolute error tolerance. Default: 1e-10
    pub tol: f64,

    /// Maximum recursion depth for adaptive Simpson. Default: 50
    pub max_depth: usize,
}

impl Default for QuadConfig {
    fn default() -> Self {
        Self {
            tol: 1e-10,
            max_depth: 50,
        }
    }
}

/// Adaptive Simpson integration of `f` over `[a, b]`.
///
/// Returns the integral value and an absolute error estimate. Reversed
/// bounds negate the result; equal bounds integrate to zero.
pub fn quad<F>(f: F, a: f64, b: f64, config: &QuadConfig) -> Result<(f64, f64)>
where
    F: Fn(f64) -> Result<f64>,
{
    if a == b {
        return Ok((0.0, 0.0));
    }
    if a > b {
        let (v, e) = quad(f, b, a, config)?;
        return Ok((-v, e));
    }

    let fa = f(a)?;
    let fb = f(b)?;
    let m = 0.5 * (a + b);
    let fm = f(m)?;
    let whole = simpson_panel(a, b, fa, fm, fb);
    adaptive_simpson(&f, a, b, fa, fm, fb, whole, config.tol, config.max_depth)
}

fn simpson_panel(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn adaptive_simpson<F>(
    f: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tol: f64,
    depth: usize,
) -> Result<(f64, f64)>
where
    F: Fn(f64) -> Result<f64>,
{
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm)?;
    let frm = f(rm)?;

    let left = simpson_panel(a, m, fa, flm, fm);
    let right = simpson_panel(m, b, fm, frm, fb);
    let delta = left + right - whole;

    if depth == 0 || delta.abs() <= 15.0 * tol {
        return Ok((left + right + delta / 15.0, delta.abs() / 15.0));
    }

    let (lv, le) = adaptive_simpson(f, a, m, fa, flm, fm, left, 0.5 * tol, depth - 1)?;
    let (rv, re) = adaptive_simpson(f, m, b, fm, frm, fb, right, 0.5 * tol, depth - 1)?;
    Ok((lv + rv, le + re))
}

/// Fixed-order Gauss-Legendre quadrature of `f` over `[a, b]`.
///
/// `n` is the number of nodes; the rule is exact for polynomials of degree
/// `2n - 1`.
pub fn fixed_quad<F>(f: F, a: f64, b: f64, n: usize) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    if n == 0 {
        return Err(ModelError::Configuration(
            "Gauss-Legendre order must be at least 1".to_string(),
        ));
    }

    let (nodes, weights) = legendre_nodes(n);
    let half = 0.5 * (b - a);
    let mid = 0.5 * (a + b);

    let mut total = 0.0;
    for (x, w) in nodes.iter().zip(weights.iter()) {
        total += w * f(mid + half * x)?;
    }
    Ok(total * half)
}

/// Gauss-Legendre nodes and weights on [-1, 1] by Newton iteration on the
/// Legendre polynomial recurrence.
fn legendre_nodes(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let m = (n + 1) / 2;

    for i in 0..m {
        // Initial guess from the Chebyshev approximation
        let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();

        for _ in 0..100 {
            // Evaluate P_n(x) and its derivative by recurrence
            let mut p0 = 1.0;
            let mut p1 = 0.0;
            for j in 0..n {
                let p2 = p1;
                p1 = p0;
                p0 = ((2.0 * j as f64 + 1.0) * x * p1 - j as f64 * p2) / (j as f64 + 1.0);
            }
            let dp = n as f64 * (x * p0 - p1) / (x * x - 1.0);
            let dx = p0 / dp;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }

        // Recompute P'_n at the converged node for the weight
        let mut p0 = 1.0;
        let mut p1 = 0.0;
        for j in 0..n {
            let p2 = p1;
            p1 = p0;
            p0 = ((2.0 * j as f64 + 1.0) * x * p1 - j as f64 * p2) / (j as f64 + 1.0);
        }
        let dp = n as f64 * (x * p0 - p1) / (x * x - 1.0);

        nodes[i] = -x;
        nodes[n - 1 - i] = x;
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        weights[i] = w;
        weights[n - 1 - i] = w;
    }

    (nodes, weights)
}

/// Romberg integration of `f` over `[a, b]`.
pub fn romberg<F>(f: F, a: f64, b: f64, config: &QuadConfig) -> Result<f64>
where
    F: Fn(f64) -> Result<f64>,
{
    const MAX_LEVELS: usize = 24;

    if a == b {
        return Ok(0.0);
    }
    if a > b {
        return Ok(-romberg(f, b, a, config)?);
    }

    let mut table = vec![vec![0.0; MAX_LEVELS]; MAX_LEVELS];
    let mut h = b - a;
    table[0][0] = 0.5 * h * (f(a)? + f(b)?);

    for k in 1..MAX_LEVELS {
        h *= 0.5;
        // Trapezoid refinement: new interior points only
        let points = 1 << (k - 1);
        let mut s = 0.0;
        for i in 0..points {
            s += f(a + h * (2.0 * i as f64 + 1.0))?;
        }
        table[k][0] = 0.5 * table[k - 1][0] + h * s;

        // Richardson extrapolation across the row
        for j in 1..=k {
            let factor = 4.0_f64.powi(j as i32);
            table[k][j] = (factor * table[k][j - 1] - table[k - 1][j - 1]) / (factor - 1.0);
        }

        if k > 2 && (table[k][k] - table[k - 1][k - 1]).abs() <= config.tol * table[k][k].abs().max(1.0)
        {
            return Ok(table[k][k]);
        }
    }

    Err(ModelError::Convergence(
        "Romberg integration did not converge".to_string(),
    ))
}

/// Trapezoid rule over sampled values `y` at points `x`.
pub fn trapezoid(y: &Array1<f64>, x: &Array1<f64>) -> Result<f64> {
    check_sampled(y, x)?;
    let mut total = 0.0;
    for i in 1..x.len() {
        total += 0.5 * (x[i] - x[i - 1]) * (y[i] + y[i - 1]);
    }
    Ok(total)
}

/// Composite Simpson rule over sampled values `y` at points `x`.
///
/// Handles non-uniform spacing; with an even number of intervals the last
/// interval falls back to the trapezoid rule.
pub fn simpson(y: &Array1<f64>, x: &Array1<f64>) -> Result<f64> {
    check_sampled(y, x)?;
    let n = x.len();
    if n < 3 {
        return trapezoid(y, x);
    }

    let mut total = 0.0;
    let mut i = 0;
    while i + 2 < n {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let h = h0 + h1;
        // Simpson weights for a possibly unequal interval pair
        total += h / 6.0
            * ((2.0 - h1 / h0) * y[i]
                + h * h / (h0 * h1) * y[i + 1]
                + (2.0 - h0 / h1) * y[i + 2]);
        i += 2;
    }
    if i + 1 < n {
        total += 0.5 * (x[n - 1] - x[n - 2]) * (y[n - 1] + y[n - 2]);
    }
    Ok(total)
}

/// Cumulative trapezoid integration over sampled values.
///
/// Returns `x.len() - 1` partial integrals, the i-th being the integral
/// from `x[0]` to `x[i + 1]`.
pub fn cumulative_trapezoid(y: &Array1<f64>, x: &Array1<f64>) -> Result<Array1<f64>> {
    check_sampled(y, x)?;
    let n = x.len();
    let mut out = Array1::zeros(n.saturating_sub(1));
    let mut total = 0.0;
    for i in 1..n {
        total += 0.5 * (x[i] - x[i - 1]) * (y[i] + y[i - 1]);
        out[i - 1] = total;
    }
    Ok(out)
}

fn check_sampled(y: &Array1<f64>, x: &Array1<f64>) -> Result<()> {
    if y.len() != x.len() {
        return Err(ModelError::ShapeMismatch(format!(
            "sampled integration needs matching arrays, got {} y values for {} x values",
            y.len(),
            x.len()
        )));
    }
    if x.len() < 2 {
        return Err(ModelError::Configuration(
            "sampled integration needs at least two points".to_string(),
        ));
    }
    Ok(())
}
