//! Generic scalar minimizers.
//!
//! The minimizers here consume an objective function mapping a parameter
//! vector to a single figure of merit. Three methods are provided:
//! Nelder-Mead simplex, Powell's direction-set method with a golden-section
//! line search, and gradient descent with finite-difference gradients and
//! backtracking.

use crate::error::Result;
use ndarray::Array1;

/// Configuration options shared by the scalar minimizers.
#[derive(Debug, Clone)]
pub struct MinimizeConfig {
    /// Maximum number of iterations. Default: 1000
    pub max_iterations: usize,

    /// Tolerance for the spread of objective values. Default: 1e-10
    pub ftol: f64,

    /// Tolerance for parameter changes. Default: 1e-10
    pub xtol: f64,
}

impl Default for MinimizeConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1e-10,
            xtol: 1e-10,
        }
    }
}

/// Result of a scalar minimization.
#[derive(Debug, Clone)]
pub struct MinimizeResult {
    /// The best parameter vector found
    pub x: Array1<f64>,

    /// Objective value at the solution
    pub fx: f64,

    /// Number of iterations performed
    pub iterations: usize,

    /// Whether a convergence criterion was met
    pub success: bool,

    /// A message describing how the minimization ended
    pub message: String,
}

/// Nelder-Mead downhill simplex minimization.
pub fn nelder_mead<F>(f: F, x0: &Array1<f64>, config: &MinimizeConfig) -> Result<MinimizeResult>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    let n = x0.len();
    if n == 0 {
        let fx = f(x0)?;
        return Ok(MinimizeResult {
            x: x0.clone(),
            fx,
            iterations: 0,
            success: true,
            message: "no free parameters".to_string(),
        });
    }

    // Initial simplex: x0 plus a perturbation along each axis
    let mut simplex: Vec<Array1<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.clone());
    for j in 0..n {
        let mut v = x0.clone();
        if v[j] != 0.0 {
            v[j] *= 1.05;
        } else {
            v[j] = 0.00025;
        }
        simplex.push(v);
    }
    let mut fvals: Vec<f64> = simplex.iter().map(|v| f(v)).collect::<Result<_>>()?;

    let (alpha, gamma, rho, sigma) = (1.0, 2.0, 0.5, 0.5);
    let mut iterations = 0;
    let mut success = false;
    let mut message = "maximum iterations reached".to_string();

    for iter in 0..config.max_iterations {
        iterations = iter + 1;

        // Order the simplex by objective value
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| fvals[a].partial_cmp(&fvals[b]).unwrap_or(std::cmp::Ordering::Equal));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        let spread = (fvals[worst] - fvals[best]).abs();
        if spread <= config.ftol * (fvals[best].abs() + fvals[worst].abs()).max(1e-30) {
            success = true;
            message = "objective spread tolerance reached".to_string();
            break;
        }

        // Centroid of all vertices except the worst
        let mut centroid = Array1::zeros(n);
        for (i, v) in simplex.iter().enumerate() {
            if i != worst {
                centroid = centroid + v;
            }
        }
        centroid /= n as f64;

        let reflected = &centroid + &((&centroid - &simplex[worst]) * alpha);
        let f_reflected = f(&reflected)?;

        if f_reflected < fvals[best] {
            let expanded = &centroid + &((&reflected - &centroid) * gamma);
            let f_expanded = f(&expanded)?;
            if f_expanded < f_reflected {
                simplex[worst] = expanded;
                fvals[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                fvals[worst] = f_reflected;
            }
        } else if f_reflected < fvals[second_worst] {
            simplex[worst] = reflected;
            fvals[worst] = f_reflected;
        } else {
            let contracted = &centroid + &((&simplex[worst] - &centroid) * rho);
            let f_contracted = f(&contracted)?;
            if f_contracted < fvals[worst] {
                simplex[worst] = contracted;
                fvals[worst] = f_contracted;
            } else {
                // Shrink everything toward the best vertex
                let best_point = simplex[best].clone();
                for i in 0..=n {
                    if i != best {
                        simplex[i] = &best_point + &((&simplex[i] - &best_point) * sigma);
                        fvals[i] = f(&simplex[i])?;
                    }
                }
            }
        }
    }

    let best = fvals
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    Ok(MinimizeResult {
        x: simplex[best].clone(),
        fx: fvals[best],
        iterations,
        success,
        message,
    })
}

/// Powell's direction-set minimization with golden-section line searches.
pub fn powell<F>(f: F, x0: &Array1<f64>, config: &MinimizeConfig) -> Result<MinimizeResult>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    let n = x0.len();
    if n == 0 {
        let fx = f(x0)?;
        return Ok(MinimizeResult {
            x: x0.clone(),
            fx,
            iterations: 0,
            success: true,
            message: "no free parameters".to_string(),
        });
    }

    // Start with the coordinate axes as the direction set
    let mut directions: Vec<Array1<f64>> = (0..n)
        .map(|j| {
            let mut d = Array1::zeros(n);
            d[j] = 1.0;
            d
        })
        .collect();

    let mut x = x0.clone();
    let mut fx = f(&x)?;
    let mut iterations = 0;
    let mut success = false;
    let mut message = "maximum iterations reached".to_string();

    for iter in 0..config.max_iterations {
        iterations = iter + 1;
        let x_start = x.clone();
        let f_start = fx;
        let mut largest_drop = 0.0;
        let mut largest_idx = 0;

        for (j, dir) in directions.iter().enumerate() {
            let f_before = fx;
            let (t, ft) = line_minimum(&f, &x, dir, config)?;
            if ft < fx {
                x = &x + &(dir * t);
                fx = ft;
            }
            if f_before - fx > largest_drop {
                largest_drop = f_before - fx;
                largest_idx = j;
            }
        }

        let delta: Array1<f64> = &x - &x_start;
        let step_norm = delta.dot(&delta).sqrt();
        if (f_start - fx).abs() <= config.ftol * (f_start.abs() + fx.abs()).max(1e-30)
            || step_norm <= config.xtol
        {
            success = true;
            message = "objective tolerance reached".to_string();
            break;
        }

        // Replace the direction of largest decrease with the overall
        // displacement and minimize along it once
        if step_norm > 0.0 {
            directions[largest_idx] = &delta / step_norm;
            let (t, ft) = line_minimum(&f, &x, &directions[largest_idx], config)?;
            if ft < fx {
                x = &x + &(&directions[largest_idx] * t);
                fx = ft;
            }
        }
    }

    Ok(MinimizeResult {
        x,
        fx,
        iterations,
        success,
        message,
    })
}

/// Gradient descent with forward-difference gradients and Armijo
/// backtracking.
pub fn gradient_descent<F>(f: F, x0: &Array1<f64>, config: &MinimizeConfig) -> Result<MinimizeResult>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    let n = x0.len();
    let mut x = x0.clone();
    let mut fx = f(&x)?;
    let mut iterations = 0;
    let mut success = false;
    let mut message = "maximum iterations reached".to_string();

    for iter in 0..config.max_iterations {
        iterations = iter + 1;

        let mut grad = Array1::zeros(n);
        for j in 0..n {
            let h = 1e-8 * x[j].abs().max(1.0);
            let mut xj = x.clone();
            xj[j] += h;
            grad[j] = (f(&xj)? - fx) / h;
        }

        let grad_norm_sq = grad.dot(&grad);
        if grad_norm_sq.sqrt() < 1e-8 {
            success = true;
            message = "gradient tolerance reached".to_string();
            break;
        }

        // Backtracking line search along the negative gradient
        let mut t = 1.0;
        let mut accepted = false;
        while t > 1e-16 {
            let x_new = &x - &(&grad * t);
            let f_new = f(&x_new)?;
            if f_new <= fx - 1e-4 * t * grad_norm_sq {
                let reduction = fx - f_new;
                x = x_new;
                fx = f_new;
                accepted = true;
                if reduction <= config.ftol * fx.abs().max(1e-30) {
                    success = true;
                    message = "objective tolerance reached".to_string();
                }
                break;
            }
            t *= 0.5;
        }

        if !accepted {
            success = true;
            message = "no descent step found".to_string();
            break;
        }
        if success {
            break;
        }
    }

    Ok(MinimizeResult {
        x,
        fx,
        iterations,
        success,
        message,
    })
}

/// Minimize `f` along `x + t * dir`, returning the best step `t` and the
/// objective value there.
fn line_minimum<F>(
    f: &F,
    x: &Array1<f64>,
    dir: &Array1<f64>,
    config: &MinimizeConfig,
) -> Result<(f64, f64)>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    let g = |t: f64| -> Result<f64> { f(&(x + &(dir * t))) };

    let (a, b, c) = bracket(&g, 0.0, 1.0)?;
    golden_section(&g, a, b, c, config.xtol.max(1e-12))
}

/// Bracket a minimum of `g` by golden-ratio expansion from `(xa, xb)`.
fn bracket<G>(g: &G, mut xa: f64, mut xb: f64) -> Result<(f64, f64, f64)>
where
    G: Fn(f64) -> Result<f64>,
{
    const GOLD: f64 = 1.618_033_988_749_895;
    const MAX_EXPANSIONS: usize = 60;

    let mut fa = g(xa)?;
    let mut fb = g(xb)?;
    if fb > fa {
        std::mem::swap(&mut xa, &mut xb);
        std::mem::swap(&mut fa, &mut fb);
    }

    let mut xc = xb + GOLD * (xb - xa);
    let mut fc = g(xc)?;
    let mut expansions = 0;

    while fc < fb {
        expansions += 1;
        if expansions > MAX_EXPANSIONS {
            break;
        }
        xa = xb;
        xb = xc;
        fb = fc;
        xc = xb + GOLD * (xb - xa);
        fc = g(xc)?;
    }

    Ok((xa, xb, xc))
}

/// Golden-section search for the minimum of `g` inside the bracket
/// `(a, b, c)` with `g(b)` below both ends.
fn golden_section<G>(g: &G, a: f64, b: f64, c: f64, tol: f64) -> Result<(f64, f64)>
where
    G: Fn(f64) -> Result<f64>,
{
    const INV_GOLD: f64 = 0.618_033_988_749_895;
    const MAX_ITER: usize = 200;

    let (mut lo, mut hi) = if a < c { (a, c) } else { (c, a) };
    let mut x1 = hi - INV_GOLD * (hi - lo);
    let mut x2 = lo + INV_GOLD * (hi - lo);
    let mut f1 = g(x1)?;
    let mut f2 = g(x2)?;
    let _ = b;

    for _ in 0..MAX_ITER {
        if (hi - lo).abs() <= tol * (lo.abs() + hi.abs()).max(1.0) {
            break;
        }
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - INV_GOLD * (hi - lo);
            f1 = g(x1)?;
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + INV_GOLD * (hi - lo);
            f2 = g(x2)?;
        }
    }

    if f1 < f2 {
        Ok((x1, f1))
    } else {
        Ok((x2, f2))
    }
}
