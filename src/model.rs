//! Generic model machinery: parameter projections, fitting, and post-fit
//! statistics.
//!
//! The [`FunctionModel`] trait is implemented by every concrete model in
//! the crate (1-D function models, composites, 2-D scalar models). It is
//! generic over the input point type, so the fitting and statistics
//! machinery is written once: a 1-D model consumes `f64` points and a 2-D
//! model consumes `[f64; 2]` points.
//!
//! The required surface is small: parameter access, the raw evaluation
//! function `f`, and the evaluation cache. Everything else - pardict
//! projection, fitting with fixed-parameter substitution, residuals,
//! chi-squared, bootstrap refits, prior mapping - is provided.

use crate::engine::{least_squares, minimize, stats, LeastSquaresConfig, MinimizeConfig};
use crate::error::{ModelError, Result};
use crate::model1d::OptimizeReport;
use ndarray::Array1;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};
use std::collections::HashMap;
use std::str::FromStr;

/// Fit methods accepted by [`FunctionModel::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMethod {
    /// Levenberg-Marquardt least squares (the default)
    LeastSquares,

    /// Nelder-Mead simplex on the contracted objective
    Simplex,

    /// Powell's direction-set method on the contracted objective
    Powell,

    /// Gradient descent on the contracted objective
    Gradient,

    /// The model's own fit routine
    Custom,
}

impl FromStr for FitMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "leastsq" | "least_squares" => Ok(FitMethod::LeastSquares),
            "simplex" | "fmin" | "nelder-mead" => Ok(FitMethod::Simplex),
            "powell" | "fmin_powell" => Ok(FitMethod::Powell),
            "gradient" | "fmin_cg" | "fmin_bfgs" => Ok(FitMethod::Gradient),
            "custom" => Ok(FitMethod::Custom),
            other => Err(ModelError::UnsupportedMethod(format!(
                "unrecognized fit method '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FitMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FitMethod::LeastSquares => "leastsq",
            FitMethod::Simplex => "simplex",
            FitMethod::Powell => "powell",
            FitMethod::Gradient => "gradient",
            FitMethod::Custom => "custom",
        };
        write!(f, "{}", s)
    }
}

/// Element-wise transform applied to each residual before reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemTransform {
    Square,
    Abs,
    Raw,
}

/// Reduction collapsing the transformed residual vector to one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Mean,
    Median,
    Product,
}

/// The contraction turning a residual vector into a scalar fit objective.
///
/// Only the `fractional` flag applies to the least-squares method, which
/// consumes the residual vector directly; the element transform and the
/// reduction drive the generic scalar minimizers.
///
/// Contractions parse from compact strings in the style of `"sumsq"`:
/// an optional `frac`, one of `sq`/`abs` (raw otherwise), and one of
/// `sum`/`mean`/`median`/`prod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contraction {
    pub elem: ElemTransform,
    pub reduce: Reduction,
    /// Use the fractional difference `1 - f(x)/y` instead of `y - f(x)`
    pub fractional: bool,
}

impl Default for Contraction {
    fn default() -> Self {
        Self {
            elem: ElemTransform::Square,
            reduce: Reduction::Sum,
            fractional: false,
        }
    }
}

impl FromStr for Contraction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let fractional = s.contains("frac");
        let elem = if s.contains("sq") {
            ElemTransform::Square
        } else if s.contains("abs") {
            ElemTransform::Abs
        } else {
            ElemTransform::Raw
        };
        let reduce = if s.contains("sum") {
            Reduction::Sum
        } else if s.contains("mean") {
            Reduction::Mean
        } else if s.contains("median") {
            Reduction::Median
        } else if s.contains("prod") {
            Reduction::Product
        } else {
            return Err(ModelError::UnsupportedMethod(format!(
                "no valid contraction method in '{}'",
                s
            )));
        };
        Ok(Self {
            elem,
            reduce,
            fractional,
        })
    }
}

/// Options controlling [`FunctionModel::fit`].
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Fit method; defaults to the model's custom routine when it has one,
    /// least squares otherwise
    pub method: Option<FitMethod>,

    /// Names of parameters held fixed at their current values
    pub fixed: Vec<String>,

    /// Per-point weights; must match the data length when given
    pub weights: Option<Array1<f64>>,

    /// Residual contraction for the scalar minimizers
    pub contraction: Contraction,

    /// Assign the best-fit values back onto the model. Default: true
    pub update_params: bool,

    /// Store `(x, y)` as the model's fitted data. Default: true
    pub save_data: bool,

    /// Fit against the raw evaluation function, bypassing any call-mode
    /// redirection. Default: false
    pub use_raw: bool,

    /// Configuration for the least-squares solver
    pub lsq: LeastSquaresConfig,

    /// Configuration for the scalar minimizers
    pub minimize: MinimizeConfig,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            method: None,
            fixed: Vec::new(),
            weights: None,
            contraction: Contraction::default(),
            update_params: true,
            save_data: true,
            use_raw: false,
            lsq: LeastSquaresConfig::default(),
            minimize: MinimizeConfig::default(),
        }
    }
}

impl FitOptions {
    /// Select a fit method.
    pub fn method(mut self, method: FitMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Hold the named parameters fixed during the fit.
    pub fn fixed(mut self, names: &[&str]) -> Self {
        self.fixed = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Weight the residuals point by point.
    pub fn weights(mut self, weights: Array1<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Select the residual contraction.
    pub fn contraction(mut self, contraction: Contraction) -> Self {
        self.contraction = contraction;
        self
    }

    /// Keep the model's parameters untouched after the fit.
    pub fn keep_params(mut self) -> Self {
        self.update_params = false;
        self
    }

    /// Do not store the fit data on the model.
    pub fn discard_data(mut self) -> Self {
        self.save_data = false;
        self
    }
}

/// Raw result of the last fit, kept for introspection.
#[derive(Debug, Clone)]
pub struct FitReport {
    /// The method that produced this result
    pub method: FitMethod,

    /// Names of the free parameters, in model order
    pub names: Vec<String>,

    /// Best-fit values of the free parameters
    pub params: Array1<f64>,

    /// Objective value at the solution (sum of squared weighted residuals
    /// for least squares and custom fits)
    pub cost: f64,

    /// Number of iterations performed
    pub iterations: usize,

    /// Whether the underlying solver reported convergence
    pub success: bool,

    /// A message describing how the solve ended
    pub message: String,
}

/// Cached evaluation state owned by each model instance.
#[derive(Debug, Clone)]
pub struct ModelCache<X: Copy> {
    /// The last dataset a fit was run against, when saved
    pub fitted_data: Option<(Vec<X>, Array1<f64>)>,

    /// Raw result of the last fit
    pub last_fit: Option<FitReport>,

    /// Value of the last integration
    pub last_integrate: Option<f64>,

    /// Raw result of the last extremum/root/value search
    pub last_optimize: Option<OptimizeReport>,
}

impl<X: Copy> Default for ModelCache<X> {
    fn default() -> Self {
        Self {
            fitted_data: None,
            last_fit: None,
            last_integrate: None,
            last_optimize: None,
        }
    }
}

/// Prior specification for one parameter, consumed by stochastic-sampling
/// collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prior {
    /// Uniform between the two bounds
    Uniform(f64, f64),

    /// Gaussian centered on the current value with the given width
    GaussianWidth(f64),

    /// Poisson with the rate set by the current value
    PoissonScale,
}

impl Prior {
    /// Validate the prior's own numbers.
    pub fn validate(&self) -> Result<()> {
        match self {
            Prior::Uniform(lo, hi) if lo >= hi => Err(ModelError::Configuration(format!(
                "uniform prior bounds are reversed: [{}, {}]",
                lo, hi
            ))),
            Prior::GaussianWidth(s) if *s <= 0.0 => Err(ModelError::Configuration(format!(
                "gaussian prior width must be positive, got {}",
                s
            ))),
            _ => Ok(()),
        }
    }

    /// Draw one value from the prior, centered on `current` where the
    /// prior kind calls for it.
    pub fn draw<R: Rng>(&self, current: f64, rng: &mut R) -> Result<f64> {
        match self {
            Prior::Uniform(lo, hi) => {
                self.validate()?;
                Ok(rng.gen_range(*lo..*hi))
            }
            Prior::GaussianWidth(s) => {
                let dist = Normal::new(current, *s).map_err(|e| {
                    ModelError::Configuration(format!("invalid gaussian prior: {}", e))
                })?;
                Ok(dist.sample(rng))
            }
            Prior::PoissonScale => {
                let dist = Poisson::new(current).map_err(|e| {
                    ModelError::Configuration(format!("invalid poisson prior: {}", e))
                })?;
                Ok(dist.sample(rng))
            }
        }
    }
}

/// The mapping handed to a stochastic-sampling collaborator: validated
/// priors in parameter order, the observed data, and the default data
/// sigma.
#[derive(Debug, Clone)]
pub struct SamplerSpec<X: Copy> {
    pub priors: Vec<(String, Prior)>,
    pub x: Vec<X>,
    pub y: Array1<f64>,
    pub data_sigma: f64,
}

/// A model that maps input points to scalar outputs through a set of named
/// parameters.
pub trait FunctionModel {
    /// The input point type: `f64` for 1-D models, `[f64; 2]` for 2-D.
    type Input: Copy;

    /// Parameter names, in model order.
    fn param_names(&self) -> Vec<String>;

    /// Current parameter values, parallel to `param_names`.
    fn par_values(&self) -> Vec<f64>;

    /// Assign parameter values positionally; fewer values than parameters
    /// assigns a prefix, more is an error.
    fn set_par_values(&mut self, values: &[f64]) -> Result<()>;

    /// Current value of the named parameter.
    fn par(&self, name: &str) -> Result<f64>;

    /// Set the named parameter.
    fn set_par(&mut self, name: &str, value: f64) -> Result<()>;

    /// The raw evaluation function, with parameters supplied explicitly.
    fn f(&self, x: Self::Input, pars: &[f64]) -> f64;

    /// The filtered evaluation function actually invoked by evaluation:
    /// defaults to `f`, but models may redirect it (call modes, coordinate
    /// transforms).
    fn filtered(&self, x: Self::Input, pars: &[f64]) -> Result<f64> {
        Ok(self.f(x, pars))
    }

    /// The model's evaluation cache.
    fn cache(&self) -> &ModelCache<Self::Input>;

    /// Mutable access to the model's evaluation cache.
    fn cache_mut(&mut self) -> &mut ModelCache<Self::Input>;

    /// Whether this model supplies its own fit routine.
    fn has_custom_fit(&self) -> bool {
        false
    }

    /// Run the model's own fit routine, returning best-fit values for the
    /// free parameters in model order.
    fn run_custom_fit(
        &self,
        _x: &[Self::Input],
        _y: &Array1<f64>,
        _fixed: &[String],
        _weights: Option<&Array1<f64>>,
    ) -> Result<Array1<f64>> {
        Err(ModelError::NotImplemented(
            "no custom fit routine provided for this model".to_string(),
        ))
    }

    /// Compute the inverse of this model for the requested output.
    ///
    /// The default declines; 1-D function models override this with a
    /// root-finding inverse.
    fn inv(&self, _y: f64) -> Result<f64> {
        Err(ModelError::NotInvertible(
            "model is not invertible".to_string(),
        ))
    }

    /// A name -> value map of the current parameters.
    fn pardict(&self) -> HashMap<String, f64> {
        self.param_names()
            .into_iter()
            .zip(self.par_values())
            .collect()
    }

    /// Assign parameters by name; unknown names are lookup errors.
    fn set_pardict(&mut self, values: &HashMap<String, f64>) -> Result<()> {
        let names = self.param_names();
        for name in values.keys() {
            if !names.contains(name) {
                return Err(ModelError::Lookup(format!(
                    "no parameter named '{}'",
                    name
                )));
            }
        }
        for (name, &v) in values.iter() {
            self.set_par(name, v)?;
        }
        Ok(())
    }

    /// Evaluate the filtered function at each point with the current
    /// parameters.
    fn eval_points(&self, xs: &[Self::Input]) -> Result<Array1<f64>> {
        let pars = self.par_values();
        let mut out = Array1::zeros(xs.len());
        for (i, &x) in xs.iter().enumerate() {
            out[i] = self.filtered(x, &pars)?;
        }
        Ok(out)
    }

    /// Resolve explicit data or fall back to the stored fitted data.
    fn resolve_data<'a>(
        &'a self,
        data: Option<(&'a [Self::Input], &'a Array1<f64>)>,
    ) -> Result<(&'a [Self::Input], &'a Array1<f64>)> {
        match data {
            Some((x, y)) => Ok((x, y)),
            None => match &self.cache().fitted_data {
                Some((x, y)) => Ok((x.as_slice(), y)),
                None => Err(ModelError::MissingData(
                    "must either specify data or save fitted data".to_string(),
                )),
            },
        }
    }

    /// Adjust the model's parameters to fit the provided data.
    ///
    /// Evaluates the filtered function against `xs`, compares with `y`,
    /// and drives the selected numeric method. Fixed parameters are held
    /// at their current values and substituted back in during evaluation.
    /// Model state is only mutated after the numeric call succeeds: on
    /// success the best-fit values are assigned to the free parameters
    /// (when `update_params`), the data is stored (when `save_data`), and
    /// the raw result is kept in `last_fit`.
    ///
    /// Returns the best-fit values of the free parameters, in model order.
    fn fit(&mut self, xs: &[Self::Input], y: &Array1<f64>, opts: &FitOptions) -> Result<Array1<f64>> {
        if xs.len() != y.len() {
            return Err(ModelError::ShapeMismatch(format!(
                "y array does not match output of model for input x: {} vs {}",
                y.len(),
                xs.len()
            )));
        }
        if let Some(w) = &opts.weights {
            if w.len() != y.len() {
                return Err(ModelError::ShapeMismatch(format!(
                    "weights shape does not match y: {} vs {}",
                    w.len(),
                    y.len()
                )));
            }
        }

        let names = self.param_names();
        for fixed_name in &opts.fixed {
            if !names.contains(fixed_name) {
                return Err(ModelError::Lookup(format!(
                    "fixed parameter '{}' is not a model parameter",
                    fixed_name
                )));
            }
        }

        let method = match opts.method {
            Some(m) => m,
            None => {
                if self.has_custom_fit() {
                    FitMethod::Custom
                } else {
                    FitMethod::LeastSquares
                }
            }
        };

        let current = self.par_values();
        let free: Vec<usize> = (0..names.len())
            .filter(|i| !opts.fixed.contains(&names[*i]))
            .collect();
        let free_names: Vec<String> = free.iter().map(|&i| names[i].clone()).collect();
        let v0 = Array1::from_iter(free.iter().map(|&i| current[i]));

        let assemble = |v: &Array1<f64>| -> Vec<f64> {
            let mut pars = current.clone();
            for (k, &i) in free.iter().enumerate() {
                pars[i] = v[k];
            }
            pars
        };
        let w_at = |i: usize| opts.weights.as_ref().map_or(1.0, |w| w[i]);
        let eval_at = |x: Self::Input, pars: &[f64]| -> Result<f64> {
            if opts.use_raw {
                Ok(self.f(x, pars))
            } else {
                self.filtered(x, pars)
            }
        };

        let (best, report) = match method {
            FitMethod::Custom => {
                if !self.has_custom_fit() {
                    return Err(ModelError::NotImplemented(
                        "no custom fit routine provided for this model".to_string(),
                    ));
                }
                let best = self.run_custom_fit(xs, y, &opts.fixed, opts.weights.as_ref())?;
                if best.len() != free.len() {
                    return Err(ModelError::Computation(format!(
                        "custom fit returned {} values for {} free parameters",
                        best.len(),
                        free.len()
                    )));
                }
                let pars = assemble(&best);
                let mut cost = 0.0;
                for (i, &x) in xs.iter().enumerate() {
                    let d = w_at(i) * (y[i] - eval_at(x, &pars)?);
                    cost += d * d;
                }
                let report = FitReport {
                    method,
                    names: free_names.clone(),
                    params: best.clone(),
                    cost,
                    iterations: 0,
                    success: true,
                    message: "custom fit".to_string(),
                };
                (best, report)
            }
            FitMethod::LeastSquares => {
                let fractional = opts.contraction.fractional;
                let residuals = |v: &Array1<f64>| -> Result<Array1<f64>> {
                    let pars = assemble(v);
                    let mut r = Array1::zeros(y.len());
                    for (i, &x) in xs.iter().enumerate() {
                        let fx = eval_at(x, &pars)?;
                        r[i] = if fractional {
                            w_at(i) * (1.0 - fx / y[i])
                        } else {
                            w_at(i) * (y[i] - fx)
                        };
                    }
                    Ok(r)
                };
                let res = least_squares::solve(residuals, &v0, &opts.lsq)?;
                let report = FitReport {
                    method,
                    names: free_names.clone(),
                    params: res.params.clone(),
                    cost: res.cost,
                    iterations: res.iterations,
                    success: res.success,
                    message: res.message,
                };
                (res.params, report)
            }
            FitMethod::Simplex | FitMethod::Powell | FitMethod::Gradient => {
                let c = opts.contraction;
                let objective = |v: &Array1<f64>| -> Result<f64> {
                    let pars = assemble(v);
                    let mut terms = Vec::with_capacity(y.len());
                    for (i, &x) in xs.iter().enumerate() {
                        let fx = eval_at(x, &pars)?;
                        let diff = if c.fractional {
                            1.0 - fx / y[i]
                        } else {
                            y[i] - fx
                        };
                        let g = match c.elem {
                            ElemTransform::Square => diff * diff,
                            ElemTransform::Abs => diff.abs(),
                            ElemTransform::Raw => diff,
                        };
                        terms.push(w_at(i) * g);
                    }
                    Ok(match c.reduce {
                        Reduction::Sum => terms.iter().sum(),
                        Reduction::Mean => terms.iter().sum::<f64>() / terms.len() as f64,
                        Reduction::Median => median(&mut terms),
                        Reduction::Product => terms.iter().product(),
                    })
                };
                let res = match method {
                    FitMethod::Simplex => minimize::nelder_mead(objective, &v0, &opts.minimize)?,
                    FitMethod::Powell => minimize::powell(objective, &v0, &opts.minimize)?,
                    _ => minimize::gradient_descent(objective, &v0, &opts.minimize)?,
                };
                let report = FitReport {
                    method,
                    names: free_names.clone(),
                    params: res.x.clone(),
                    cost: res.fx,
                    iterations: res.iterations,
                    success: res.success,
                    message: res.message,
                };
                (res.x, report)
            }
        };

        // Numeric work done; commit state
        self.cache_mut().last_fit = Some(report);
        if opts.update_params {
            for (k, name) in free_names.iter().enumerate() {
                self.set_par(name, best[k])?;
            }
        }
        if opts.save_data {
            self.cache_mut().fitted_data = Some((xs.to_vec(), y.clone()));
        }

        Ok(best)
    }

    /// Residuals `y - model(x)` against explicit data or the stored fitted
    /// data.
    fn residuals(&self, data: Option<(&[Self::Input], &Array1<f64>)>) -> Result<Array1<f64>> {
        let (xs, y) = self.resolve_data(data)?;
        let pred = self.eval_points(xs)?;
        if pred.len() != y.len() {
            return Err(ModelError::ShapeMismatch(format!(
                "y array does not match output of model for input x: {} vs {}",
                y.len(),
                pred.len()
            )));
        }
        Ok(y - &pred)
    }

    /// Standard deviation of the model from the data, with the parameter
    /// count as delta degrees of freedom.
    fn std_data(&self, data: Option<(&[Self::Input], &Array1<f64>)>) -> Result<f64> {
        let r = self.residuals(data)?;
        let n = r.len();
        let m = self.param_names().len();
        if n <= m {
            return Err(ModelError::Computation(format!(
                "need more than {} data points for {} parameters",
                m, m
            )));
        }
        let mean = r.sum() / n as f64;
        let ss = r.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>();
        Ok((ss / (n - m) as f64).sqrt())
    }

    /// Pearson chi-squared statistic for the data assuming this model.
    ///
    /// Returns `(chi2, reduced_chi2, p_value)` with `n - m - 1` degrees of
    /// freedom for `n` points and `m` parameters.
    fn chi_squared(&self, data: Option<(&[Self::Input], &Array1<f64>)>) -> Result<(f64, f64, f64)> {
        let (xs, y) = self.resolve_data(data)?;
        let pred = self.eval_points(xs)?;
        if pred.len() != y.len() {
            return Err(ModelError::ShapeMismatch(format!(
                "y array does not match output of model for input x: {} vs {}",
                y.len(),
                pred.len()
            )));
        }

        let n = y.len();
        let m = self.param_names().len();
        if n < m + 2 {
            return Err(ModelError::Computation(format!(
                "need at least {} data points for {} parameters",
                m + 2,
                m
            )));
        }
        let dof = (n - m - 1) as f64;

        let mut chi2 = 0.0;
        for i in 0..n {
            let d = y[i] - pred[i];
            chi2 += d * d / pred[i];
        }

        let p = stats::chi2_survival(chi2, dof)?;
        Ok((chi2, chi2 / dof, p))
    }

    /// Estimate parameter distributions by bootstrap resampling.
    ///
    /// Resamples `(x, y)` pairs with replacement `n` times, refits a copy
    /// of the model to each resample, and returns the full distribution of
    /// fitted values per parameter. The live model is never mutated.
    fn bootstrap_fit<R: Rng>(
        &self,
        data: Option<(&[Self::Input], &Array1<f64>)>,
        n: usize,
        opts: &FitOptions,
        rng: &mut R,
    ) -> Result<HashMap<String, Vec<f64>>>
    where
        Self: Clone + Sized,
    {
        let (xs, y) = self.resolve_data(data)?;
        let len = xs.len();
        if len == 0 {
            return Err(ModelError::MissingData(
                "cannot bootstrap an empty dataset".to_string(),
            ));
        }

        let names = self.param_names();
        let mut samples: HashMap<String, Vec<f64>> = names
            .iter()
            .map(|name| (name.clone(), Vec::with_capacity(n)))
            .collect();

        let mut refit_opts = opts.clone();
        refit_opts.update_params = true;
        refit_opts.save_data = false;

        for _ in 0..n {
            let mut xb = Vec::with_capacity(len);
            let mut yb = Vec::with_capacity(len);
            for _ in 0..len {
                let k = rng.gen_range(0..len);
                xb.push(xs[k]);
                yb.push(y[k]);
            }

            let mut work = self.clone();
            work.fit(&xb, &Array1::from_vec(yb), &refit_opts)?;
            for name in &names {
                let value = work.par(name)?;
                if let Some(dist) = samples.get_mut(name) {
                    dist.push(value);
                }
            }
        }

        Ok(samples)
    }

    /// Build the prior mapping consumed by a stochastic-sampling
    /// collaborator.
    ///
    /// The prior map must cover exactly the model's parameters; the data
    /// sigma defaults to the standard deviation of `y`.
    fn sampler_spec(
        &self,
        priors: &HashMap<String, Prior>,
        xs: &[Self::Input],
        y: &Array1<f64>,
    ) -> Result<SamplerSpec<Self::Input>> {
        let names = self.param_names();
        if priors.len() != names.len() || names.iter().any(|n| !priors.contains_key(n)) {
            return Err(ModelError::Configuration(
                "input priors don't match the model parameters".to_string(),
            ));
        }
        for prior in priors.values() {
            prior.validate()?;
        }
        if xs.len() != y.len() {
            return Err(ModelError::ShapeMismatch(format!(
                "y array does not match x: {} vs {}",
                y.len(),
                xs.len()
            )));
        }

        let mean = y.sum() / y.len() as f64;
        let data_sigma =
            (y.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / y.len() as f64).sqrt();

        Ok(SamplerSpec {
            priors: names
                .into_iter()
                .map(|name| {
                    let prior = priors[&name];
                    (name, prior)
                })
                .collect(),
            x: xs.to_vec(),
            y: y.clone(),
            data_sigma,
        })
    }
}

/// Per-point fit weights from equal-width binning of `values`.
///
/// The range of `values` (or of their logarithms with `log`) is split into
/// `n` bins and every point is weighted by the reciprocal of its bin's
/// occupancy, so densely sampled stretches of the data do not dominate a
/// fit objective.
pub fn binned_weights(values: &Array1<f64>, n: usize, log: bool) -> Result<Array1<f64>> {
    if n == 0 {
        return Err(ModelError::Configuration(
            "binned weights need at least one bin".to_string(),
        ));
    }
    if values.is_empty() {
        return Err(ModelError::MissingData("no values to weight".to_string()));
    }

    let vals: Vec<f64> = if log {
        if values.iter().any(|&v| v <= 0.0) {
            return Err(ModelError::Configuration(
                "logarithmic binning requires positive values".to_string(),
            ));
        }
        values.iter().map(|v| v.ln()).collect()
    } else {
        values.to_vec()
    };

    let (lo, hi) = vals
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo == hi {
        return Ok(Array1::from_elem(values.len(), 1.0 / values.len() as f64));
    }

    let width = (hi - lo) / n as f64;
    let bin_of = |v: f64| (((v - lo) / width) as usize).min(n - 1);
    let mut counts = vec![0usize; n];
    for &v in &vals {
        counts[bin_of(v)] += 1;
    }
    Ok(Array1::from_iter(
        vals.iter().map(|&v| 1.0 / counts[bin_of(v)] as f64),
    ))
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}
