//! One-dimensional function models.
//!
//! This module provides the [`Model1D`] trait - evaluation over arrays and
//! shaped input, call-mode redirection, numeric derivatives, the definite
//! integration family, scalar inversion, and local extremum/root/value
//! searches - together with [`FunctionModel1D`], the closure-backed
//! concrete model every 1-D model in the crate is built from.

use crate::engine::{quadrature, roots, MinimizeConfig, QuadConfig, RootConfig};
use crate::error::{ModelError, Result};
use crate::model::{FunctionModel, ModelCache};
use crate::params::{ModelSpec, ParamSet};
use ndarray::{Array1, ArrayD};
use std::f64::consts::PI;
use std::str::FromStr;
use std::sync::Arc;

/// Named axis transforms applied around a call-mode evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisTransform {
    /// Base-10 logarithm
    Log10,

    /// Natural logarithm
    Ln,

    /// Power of ten
    Pow10,

    /// Exponential
    Exp,
}

impl AxisTransform {
    pub fn apply(self, v: f64) -> f64 {
        match self {
            AxisTransform::Log10 => v.log10(),
            AxisTransform::Ln => v.ln(),
            AxisTransform::Pow10 => 10f64.powf(v),
            AxisTransform::Exp => v.exp(),
        }
    }
}

impl FromStr for AxisTransform {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "log" => Ok(AxisTransform::Log10),
            "ln" => Ok(AxisTransform::Ln),
            "pow" => Ok(AxisTransform::Pow10),
            "exp" => Ok(AxisTransform::Exp),
            other => Err(ModelError::Lookup(format!(
                "unknown axis transform '{}'",
                other
            ))),
        }
    }
}

/// Jacobian weighting applied to call-mode and direct integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegralKind {
    /// Plain 1-D integration
    Linear,

    /// Azimuthally symmetric 2-D radial profile: weight `2*pi*r`
    Circular,

    /// Spherically symmetric 3-D radial profile: weight `4*pi*r^2`
    Spherical,
}

impl IntegralKind {
    pub fn jacobian(self, x: f64) -> f64 {
        match self {
            IntegralKind::Linear => 1.0,
            IntegralKind::Circular => 2.0 * PI * x,
            IntegralKind::Spherical => 4.0 * PI * x * x,
        }
    }
}

/// The bound of a call-mode integral that stays fixed; the call argument
/// supplies the other bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedBound {
    Lower(f64),
    Upper(f64),
}

/// What `eval` computes when the model is called.
#[derive(Clone)]
pub enum CallMode {
    /// Plain evaluation of the model function
    Raw,

    /// Forward-difference derivative with the given spacing
    Derivative { dx: f64 },

    /// Definite integral with one bound fixed; the call argument supplies
    /// the other bound
    Integral { kind: IntegralKind, bound: FixedBound },

    /// Arbitrary computation with the call input substituted as the one
    /// free argument
    Custom(Arc<dyn Fn(f64, &[f64]) -> Result<f64> + Send + Sync>),
}

/// Discriminant of a [`CallMode`], for introspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallKind {
    Raw,
    Derivative,
    Integral(IntegralKind),
    Custom,
}

/// The complete call-mode configuration of a model. Exactly one mode is
/// active at a time; installing a new configuration fully replaces the
/// previous one.
#[derive(Clone)]
pub struct CallConfig {
    pub mode: CallMode,

    /// Transform applied to the call input before the computation
    pub xtrans: Option<AxisTransform>,

    /// Transform applied to the result after the computation
    pub ytrans: Option<AxisTransform>,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            mode: CallMode::Raw,
            xtrans: None,
            ytrans: None,
        }
    }
}

impl CallConfig {
    /// Plain evaluation.
    pub fn raw() -> Self {
        Self::default()
    }

    /// Derivative evaluation with the given spacing.
    pub fn derivative(dx: f64) -> Self {
        Self {
            mode: CallMode::Derivative { dx },
            ..Self::default()
        }
    }

    /// Integral evaluation with an explicit fixed bound.
    pub fn integral(kind: IntegralKind, bound: FixedBound) -> Self {
        Self {
            mode: CallMode::Integral { kind, bound },
            ..Self::default()
        }
    }

    /// Integral evaluation with the lower bound fixed at zero.
    pub fn integral_from_zero(kind: IntegralKind) -> Self {
        Self::integral(kind, FixedBound::Lower(0.0))
    }

    /// Arbitrary computation with the call input as its free argument.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f64, &[f64]) -> Result<f64> + Send + Sync + 'static,
    {
        Self {
            mode: CallMode::Custom(Arc::new(f)),
            ..Self::default()
        }
    }

    /// Apply a transform to the call input.
    pub fn with_xtrans(mut self, t: AxisTransform) -> Self {
        self.xtrans = Some(t);
        self
    }

    /// Apply a transform to the result.
    pub fn with_ytrans(mut self, t: AxisTransform) -> Self {
        self.ytrans = Some(t);
        self
    }

    /// The discriminant of the active mode.
    pub fn kind(&self) -> CallKind {
        match &self.mode {
            CallMode::Raw => CallKind::Raw,
            CallMode::Derivative { .. } => CallKind::Derivative,
            CallMode::Integral { kind, .. } => CallKind::Integral(*kind),
            CallMode::Custom(_) => CallKind::Custom,
        }
    }
}

impl std::fmt::Debug for CallConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallConfig")
            .field("kind", &self.kind())
            .field("xtrans", &self.xtrans)
            .field("ytrans", &self.ytrans)
            .finish()
    }
}

/// Integration techniques accepted by [`Model1D::integrate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntMethod {
    /// Adaptive quadrature (the default)
    Quad,

    /// Fixed-order Gauss-Legendre quadrature
    FixedQuad,

    /// Romberg extrapolation
    Romberg,

    /// Sampled trapezoid rule
    Trapz,

    /// Sampled Simpson rule
    Simps,
}

impl FromStr for IntMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "quad" | "quadrature" => Ok(IntMethod::Quad),
            "fixed_quad" => Ok(IntMethod::FixedQuad),
            "romberg" => Ok(IntMethod::Romberg),
            "trapz" => Ok(IntMethod::Trapz),
            "simps" => Ok(IntMethod::Simps),
            other => Err(ModelError::UnsupportedMethod(format!(
                "unrecognized integration method '{}'",
                other
            ))),
        }
    }
}

/// Root-finding techniques accepted by [`Model1D::invert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootMethod {
    /// Secant iteration from a starting point
    Newton,

    /// Brent's method on a bracketing interval
    Brentq,
}

/// Where an inversion starts: a single point for secant iteration, or a
/// bracketing interval for Brent's method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvertStart {
    At(f64),
    Bracket(f64, f64),
}

impl Default for InvertStart {
    fn default() -> Self {
        InvertStart::At(0.0)
    }
}

/// Objective transform used by the shared search dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchObjective {
    /// The function itself (local minimum)
    Minimum,

    /// The negated function (local maximum)
    Maximum,

    /// The absolute value (zero crossing)
    Root,

    /// The absolute difference from a target value
    Value(f64),
}

/// Minimizers accepted by the search dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizeMethod {
    Simplex,
    Powell,
}

impl FromStr for OptimizeMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fmin" | "simplex" => Ok(OptimizeMethod::Simplex),
            "fmin_powell" | "powell" => Ok(OptimizeMethod::Powell),
            other => Err(ModelError::UnsupportedMethod(format!(
                "unrecognized optimization method '{}'",
                other
            ))),
        }
    }
}

/// Raw result of the last extremum/root/value search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizeReport {
    /// Location found
    pub x: f64,

    /// Objective value at the location
    pub fx: f64,

    /// Number of iterations performed
    pub iterations: usize,

    /// The objective transform that was searched
    pub objective: SearchObjective,

    /// The minimizer that was used
    pub method: OptimizeMethod,
}

/// Options for [`Model1D::sample_curve`].
#[derive(Debug, Clone, Copy)]
pub struct SampleOptions {
    /// Number of samples. Default: 100
    pub n: usize,

    /// Space samples logarithmically between the bounds
    pub log_x: bool,

    /// Raise the sample locations to powers of ten before evaluation
    pub power_x: bool,

    /// Raise the outputs to powers of ten
    pub power_y: bool,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            n: 100,
            log_x: false,
            power_x: false,
            power_y: false,
        }
    }
}

/// Evaluate a model's call configuration at one point with explicit
/// parameter values.
pub(crate) fn eval_call<M>(model: &M, x: f64, pars: &[f64]) -> Result<f64>
where
    M: Model1D,
{
    let config = model.call_config();
    let xv = match config.xtrans {
        Some(t) => t.apply(x),
        None => x,
    };

    let raw = match &config.mode {
        CallMode::Raw => model.f(xv, pars),
        CallMode::Derivative { dx } => (model.f(xv + dx, pars) - model.f(xv, pars)) / dx,
        CallMode::Integral { kind, bound } => {
            let kind = *kind;
            let g = |t: f64| -> Result<f64> { Ok(kind.jacobian(t) * model.f(t, pars)) };
            let (value, _) = match bound {
                FixedBound::Lower(lo) => quadrature::quad(g, *lo, xv, &QuadConfig::default())?,
                FixedBound::Upper(hi) => quadrature::quad(g, xv, *hi, &QuadConfig::default())?,
            };
            value
        }
        CallMode::Custom(func) => func(xv, pars)?,
    };

    Ok(match config.ytrans {
        Some(t) => t.apply(raw),
        None => raw,
    })
}

/// One-dimensional model surface: array evaluation, call modes,
/// derivatives, integration, inversion, and local searches.
pub trait Model1D: FunctionModel<Input = f64> + Sized {
    /// The active call configuration.
    fn call_config(&self) -> &CallConfig;

    /// Mutable access to the call configuration.
    fn call_config_mut(&mut self) -> &mut CallConfig;

    /// A model-declared default domain, used when no data is present.
    fn range_hint(&self) -> Option<(f64, f64)> {
        None
    }

    /// Replace the call configuration, redirecting what `eval` computes.
    fn set_call(&mut self, config: CallConfig) {
        *self.call_config_mut() = config;
    }

    /// Restore plain evaluation.
    fn clear_call(&mut self) {
        *self.call_config_mut() = CallConfig::default();
    }

    /// The active call configuration.
    fn get_call(&self) -> &CallConfig {
        self.call_config()
    }

    /// Evaluate the filtered function at one point with the current
    /// parameters.
    fn at(&self, x: f64) -> Result<f64> {
        let pars = self.par_values();
        self.filtered(x, &pars)
    }

    /// Evaluate the filtered function over an array of points.
    fn eval(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        let pars = self.par_values();
        let values = x
            .iter()
            .map(|&v| self.filtered(v, &pars))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Array1::from_vec(values))
    }

    /// Evaluate over an arbitrarily shaped array: the input is flattened,
    /// evaluated, and the output reshaped back to the input's shape.
    fn eval_shaped(&self, x: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let pars = self.par_values();
        let values = x
            .iter()
            .map(|&v| self.filtered(v, &pars))
            .collect::<Result<Vec<f64>>>()?;
        ArrayD::from_shape_vec(x.raw_dim(), values)
            .map_err(|e| ModelError::ShapeMismatch(e.to_string()))
    }

    /// Forward-difference derivative of the filtered function at `x`.
    fn derivative(&self, x: f64, dx: f64) -> Result<f64> {
        Ok((self.at(x + dx)? - self.at(x)?) / dx)
    }

    /// Numerically integrate the raw model function from `lower` to
    /// `upper`, optionally weighted by a Jacobian factor.
    ///
    /// The integrand is always the raw evaluation function, not the
    /// filtered one. `n` is the node count for the fixed-order rule or the
    /// sample count for the sampled rules. The result is stored in the
    /// cache as `last_integrate`.
    fn integrate(
        &mut self,
        lower: f64,
        upper: f64,
        method: Option<IntMethod>,
        n: Option<usize>,
        jac: Option<&dyn Fn(f64, &[f64]) -> f64>,
    ) -> Result<f64> {
        let pars = self.par_values();
        let g = |t: f64| -> Result<f64> {
            let base = self.f(t, &pars);
            Ok(match jac {
                Some(j) => j(t, &pars) * base,
                None => base,
            })
        };

        let value = match method.unwrap_or(IntMethod::Quad) {
            IntMethod::Quad => quadrature::quad(&g, lower, upper, &QuadConfig::default())?.0,
            IntMethod::FixedQuad => quadrature::fixed_quad(&g, lower, upper, n.unwrap_or(5))?,
            IntMethod::Romberg => quadrature::romberg(&g, lower, upper, &QuadConfig::default())?,
            IntMethod::Trapz | IntMethod::Simps => {
                let samples = n.unwrap_or(100).max(2);
                let xs = Array1::linspace(lower, upper, samples);
                let ys = xs.iter().map(|&t| g(t)).collect::<Result<Vec<f64>>>()?;
                let ys = Array1::from_vec(ys);
                if method == Some(IntMethod::Trapz) {
                    quadrature::trapezoid(&ys, &xs)?
                } else {
                    quadrature::simpson(&ys, &xs)?
                }
            }
        };

        self.cache_mut().last_integrate = Some(value);
        Ok(value)
    }

    /// Integrate with the azimuthal Jacobian `2*pi*r`, composing any
    /// supplied Jacobian factor.
    fn integrate_circular(
        &mut self,
        lower: f64,
        upper: f64,
        method: Option<IntMethod>,
        n: Option<usize>,
        jac: Option<&dyn Fn(f64, &[f64]) -> f64>,
    ) -> Result<f64> {
        match jac {
            Some(j) => {
                let wrapped = move |x: f64, pars: &[f64]| j(x, pars) * x * 2.0 * PI;
                self.integrate(lower, upper, method, n, Some(&wrapped))
            }
            None => {
                let plain = |x: f64, _: &[f64]| x * 2.0 * PI;
                self.integrate(lower, upper, method, n, Some(&plain))
            }
        }
    }

    /// Integrate with the spherical Jacobian `4*pi*r^2`, composing any
    /// supplied Jacobian factor.
    fn integrate_spherical(
        &mut self,
        lower: f64,
        upper: f64,
        method: Option<IntMethod>,
        n: Option<usize>,
        jac: Option<&dyn Fn(f64, &[f64]) -> f64>,
    ) -> Result<f64> {
        match jac {
            Some(j) => {
                let wrapped = move |x: f64, pars: &[f64]| j(x, pars) * x * x * 4.0 * PI;
                self.integrate(lower, upper, method, n, Some(&wrapped))
            }
            None => {
                let plain = |x: f64, _: &[f64]| x * x * 4.0 * PI;
                self.integrate(lower, upper, method, n, Some(&plain))
            }
        }
    }

    /// Find the x value where the filtered function equals `y`.
    ///
    /// The default method is secant iteration from a starting point and
    /// Brent's method on a bracket.
    fn invert(&self, y: f64, start: InvertStart, method: Option<RootMethod>) -> Result<f64> {
        let pars = self.par_values();
        let g = |x: f64| -> Result<f64> { Ok(self.filtered(x, &pars)? - y) };

        let method = method.unwrap_or(match start {
            InvertStart::At(_) => RootMethod::Newton,
            InvertStart::Bracket(_, _) => RootMethod::Brentq,
        });

        match (method, start) {
            (RootMethod::Newton, InvertStart::At(x0)) => roots::newton(g, x0, &RootConfig::default()),
            (RootMethod::Newton, InvertStart::Bracket(a, b)) => {
                roots::newton(g, 0.5 * (a + b), &RootConfig::default())
            }
            (RootMethod::Brentq, InvertStart::Bracket(a, b)) => {
                roots::brentq(g, a, b, &RootConfig::default())
            }
            (RootMethod::Brentq, InvertStart::At(_)) => Err(ModelError::Configuration(
                "Brent inversion requires a bracketing interval".to_string(),
            )),
        }
    }

    /// Shared search dispatcher: minimize a transform of the raw model
    /// function starting from `x0`, storing the raw result in the cache.
    fn optimize(
        &mut self,
        x0: f64,
        objective: SearchObjective,
        method: OptimizeMethod,
    ) -> Result<f64> {
        let pars = self.par_values();
        let g = |v: &Array1<f64>| -> Result<f64> {
            let fx = self.f(v[0], &pars);
            Ok(match objective {
                SearchObjective::Minimum => fx,
                SearchObjective::Maximum => -fx,
                SearchObjective::Root => fx.abs(),
                SearchObjective::Value(target) => (fx - target).abs(),
            })
        };

        let x0 = Array1::from_vec(vec![x0]);
        let config = MinimizeConfig::default();
        let res = match method {
            OptimizeMethod::Simplex => crate::engine::minimize::nelder_mead(g, &x0, &config)?,
            OptimizeMethod::Powell => crate::engine::minimize::powell(g, &x0, &config)?,
        };

        let found = res.x[0];
        self.cache_mut().last_optimize = Some(OptimizeReport {
            x: found,
            fx: res.fx,
            iterations: res.iterations,
            objective,
            method,
        });
        Ok(found)
    }

    /// Find a local minimum of the model starting from `x0`.
    fn minimize(&mut self, x0: f64, method: OptimizeMethod) -> Result<f64> {
        self.optimize(x0, SearchObjective::Minimum, method)
    }

    /// Find a local maximum of the model starting from `x0`.
    fn maximize(&mut self, x0: f64, method: OptimizeMethod) -> Result<f64> {
        self.optimize(x0, SearchObjective::Maximum, method)
    }

    /// Find a zero crossing of the model starting from `x0`.
    fn find_root(&mut self, x0: f64, method: OptimizeMethod) -> Result<f64> {
        self.optimize(x0, SearchObjective::Root, method)
    }

    /// Find where the model equals `value`, starting from `x0`.
    fn find_value(&mut self, value: f64, x0: f64, method: OptimizeMethod) -> Result<f64> {
        self.optimize(x0, SearchObjective::Value(value), method)
    }

    /// Sample the model over a domain chosen from explicit bounds, the
    /// stored fitted data, or the range hint, in that order.
    fn sample_curve(
        &self,
        lower: Option<f64>,
        upper: Option<f64>,
        opts: &SampleOptions,
    ) -> Result<(Array1<f64>, Array1<f64>)> {
        let data_range = self.cache().fitted_data.as_ref().map(|(xs, _)| {
            xs.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
        });

        let lo = lower
            .or(data_range.map(|r| r.0))
            .or(self.range_hint().map(|r| r.0));
        let hi = upper
            .or(data_range.map(|r| r.1))
            .or(self.range_hint().map(|r| r.1));
        let (lo, hi) = match (lo, hi) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => {
                return Err(ModelError::MissingData(
                    "can't choose sampling limits without data or a range hint".to_string(),
                ))
            }
        };

        let n = opts.n.max(2);
        let mut xs = if opts.log_x {
            if lo <= 0.0 || hi <= 0.0 {
                return Err(ModelError::Configuration(
                    "logarithmic sampling requires positive bounds".to_string(),
                ));
            }
            Array1::linspace(lo.log10(), hi.log10(), n).mapv(|v| 10f64.powf(v))
        } else {
            Array1::linspace(lo, hi, n)
        };
        if opts.power_x {
            xs = xs.mapv(|v| 10f64.powf(v));
        }

        let mut ys = self.eval(&xs)?;
        if opts.power_y {
            ys = ys.mapv(|v| 10f64.powf(v));
        }
        Ok((xs, ys))
    }
}

/// Signature of a model-specific fit routine: current parameters, data,
/// fixed parameter names, and optional weights in; best-fit values for the
/// free parameters (in model order) out.
pub type CustomFitFn = dyn Fn(&ParamSet, &[f64], &Array1<f64>, &[String], Option<&Array1<f64>>) -> Result<Array1<f64>>
    + Send
    + Sync;

/// A 1-D model wrapping a pure evaluation function.
///
/// The function receives the evaluation point and the parameter values in
/// model order. Optional closures supply a model-specific fit routine and
/// a closed-form inverse.
///
/// # Examples
///
/// ```
/// use astromod::model1d::{FunctionModel1D, Model1D};
/// use astromod::params::ModelSpec;
/// use ndarray::array;
///
/// let spec = ModelSpec::builder("line")
///     .param("m", 2.0)
///     .param("b", 0.0)
///     .build()
///     .unwrap();
/// let model = FunctionModel1D::from_spec(&spec, None, |x, p| p[0] * x + p[1]).unwrap();
///
/// let y = model.eval(&array![0.0, 1.0, 2.0]).unwrap();
/// assert_eq!(y, array![0.0, 2.0, 4.0]);
/// ```
#[derive(Clone)]
pub struct FunctionModel1D {
    type_name: String,
    params: ParamSet,
    func: Arc<dyn Fn(f64, &[f64]) -> f64 + Send + Sync>,
    custom_fit: Option<Arc<CustomFitFn>>,
    custom_inverse: Option<Arc<dyn Fn(f64, &[f64]) -> f64 + Send + Sync>>,
    call: CallConfig,
    cache: ModelCache<f64>,
    range_hint: Option<(f64, f64)>,
}

impl FunctionModel1D {
    /// Create a model from a parameter set and an evaluation function.
    pub fn new<F>(type_name: &str, params: ParamSet, func: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.to_string(),
            params,
            func: Arc::new(func),
            custom_fit: None,
            custom_inverse: None,
            call: CallConfig::default(),
            cache: ModelCache::default(),
            range_hint: None,
        }
    }

    /// Create a model from a parameter schema, materializing the schema
    /// with the given open-arity count.
    pub fn from_spec<F>(spec: &ModelSpec, nparams: Option<usize>, func: F) -> Result<Self>
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        let params = spec.materialize(nparams)?;
        Ok(Self::new(spec.name(), params, func))
    }

    /// Install a model-specific fit routine, used when fitting with the
    /// custom method (and by default when no method is requested).
    pub fn with_custom_fit<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParamSet, &[f64], &Array1<f64>, &[String], Option<&Array1<f64>>) -> Result<Array1<f64>>
            + Send
            + Sync
            + 'static,
    {
        self.custom_fit = Some(Arc::new(f));
        self
    }

    /// Install a closed-form inverse, used by [`FunctionModel::inv`].
    pub fn with_custom_inverse<F>(mut self, f: F) -> Self
    where
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        self.custom_inverse = Some(Arc::new(f));
        self
    }

    /// Declare the relevant domain of the model.
    pub fn with_range_hint(mut self, lower: f64, upper: f64) -> Self {
        self.range_hint = Some((lower, upper));
        self
    }

    /// The registered type name of this model.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The model's parameter set.
    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    /// Mutable access to the model's parameter set.
    pub fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }
}

impl std::fmt::Debug for FunctionModel1D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionModel1D")
            .field("type_name", &self.type_name)
            .field("params", &self.params)
            .field("call", &self.call)
            .finish()
    }
}

impl FunctionModel for FunctionModel1D {
    type Input = f64;

    fn param_names(&self) -> Vec<String> {
        self.params.names()
    }

    fn par_values(&self) -> Vec<f64> {
        self.params.values()
    }

    fn set_par_values(&mut self, values: &[f64]) -> Result<()> {
        self.params.set_values(values)
    }

    fn par(&self, name: &str) -> Result<f64> {
        self.params.value_of(name)
    }

    fn set_par(&mut self, name: &str, value: f64) -> Result<()> {
        self.params.set_value_of(name, value)
    }

    fn f(&self, x: f64, pars: &[f64]) -> f64 {
        (self.func)(x, pars)
    }

    fn filtered(&self, x: f64, pars: &[f64]) -> Result<f64> {
        eval_call(self, x, pars)
    }

    fn cache(&self) -> &ModelCache<f64> {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut ModelCache<f64> {
        &mut self.cache
    }

    fn has_custom_fit(&self) -> bool {
        self.custom_fit.is_some()
    }

    fn run_custom_fit(
        &self,
        x: &[f64],
        y: &Array1<f64>,
        fixed: &[String],
        weights: Option<&Array1<f64>>,
    ) -> Result<Array1<f64>> {
        match &self.custom_fit {
            Some(func) => func(&self.params, x, y, fixed, weights),
            None => Err(ModelError::NotImplemented(
                "no custom fit routine provided for this model".to_string(),
            )),
        }
    }

    fn inv(&self, y: f64) -> Result<f64> {
        match &self.custom_inverse {
            Some(func) => Ok(func(y, &self.params.values())),
            None => self.invert(y, InvertStart::default(), None),
        }
    }
}

impl Model1D for FunctionModel1D {
    fn call_config(&self) -> &CallConfig {
        &self.call
    }

    fn call_config_mut(&mut self) -> &mut CallConfig {
        &mut self.call
    }

    fn range_hint(&self) -> Option<(f64, f64)> {
        self.range_hint
    }
}

/// Locate the points where two models intersect on an interval.
///
/// Candidate crossings come from a sign-change scan over `nsample` points;
/// each is refined with Brent's method. When `bounds` is absent, the scan
/// interval is taken from either model's stored fitted data.
pub fn intersect_models<A, B>(
    a: &A,
    b: &B,
    bounds: Option<(f64, f64)>,
    nsample: usize,
) -> Result<Vec<f64>>
where
    A: Model1D,
    B: Model1D,
{
    let bounds = match bounds {
        Some(bd) => bd,
        None => {
            let range = |xs: &Vec<f64>| {
                xs.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
            };
            let da = a.cache().fitted_data.as_ref().map(|(xs, _)| range(xs));
            let db = b.cache().fitted_data.as_ref().map(|(xs, _)| range(xs));
            match (da, db) {
                (None, None) => {
                    return Err(ModelError::MissingData(
                        "must supply bounds if neither model has fitted data".to_string(),
                    ))
                }
                (Some(r), None) | (None, Some(r)) => r,
                (Some(ra), Some(rb)) => (ra.0.min(rb.0), ra.1.max(rb.1)),
            }
        }
    };

    let n = nsample.max(2);
    let xs = Array1::linspace(bounds.0, bounds.1, n);
    let ya = a.eval(&xs)?;
    let yb = b.eval(&xs)?;

    let g = |x: f64| -> Result<f64> { Ok(a.at(x)? - b.at(x)?) };
    let mut crossings = Vec::new();
    for i in 1..n {
        let d0 = ya[i - 1] - yb[i - 1];
        let d1 = ya[i] - yb[i];
        if d0 == 0.0 {
            crossings.push(xs[i - 1]);
        } else if d1 != 0.0 && d0.signum() != d1.signum() {
            crossings.push(roots::brentq(&g, xs[i - 1], xs[i], &RootConfig::default())?);
        }
    }
    if n >= 2 && ya[n - 1] == yb[n - 1] {
        crossings.push(xs[n - 1]);
    }

    crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    crossings.dedup();
    Ok(crossings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FunctionModel;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn line() -> FunctionModel1D {
        let spec = ModelSpec::builder("line")
            .param("m", 2.0)
            .param("b", 1.0)
            .build()
            .unwrap();
        FunctionModel1D::from_spec(&spec, None, |x, p| p[0] * x + p[1]).unwrap()
    }

    #[test]
    fn test_eval_and_at() {
        let model = line();
        assert_relative_eq!(model.at(3.0).unwrap(), 7.0);
        let y = model.eval(&array![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(y, array![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_eval_shaped_round_trips_shape() {
        let model = line();
        let x = ArrayD::from_shape_vec(vec![2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let y = model.eval_shaped(&x).unwrap();
        assert_eq!(y.shape(), &[2, 3]);
        assert_relative_eq!(y[[1, 2]], 11.0);
    }

    #[test]
    fn test_axis_transform_parsing() {
        assert_eq!("log".parse::<AxisTransform>().unwrap(), AxisTransform::Log10);
        assert_eq!("exp".parse::<AxisTransform>().unwrap(), AxisTransform::Exp);
        assert!("sqrt".parse::<AxisTransform>().is_err());
    }

    #[test]
    fn test_call_mode_replaces_previous() {
        let mut model = line();
        model.set_call(CallConfig::derivative(1e-6));
        assert_eq!(model.get_call().kind(), CallKind::Derivative);

        model.set_call(CallConfig::raw().with_ytrans(AxisTransform::Exp));
        assert_eq!(model.get_call().kind(), CallKind::Raw);
        assert_eq!(model.get_call().ytrans, Some(AxisTransform::Exp));
        // the derivative configuration is gone entirely
        assert_eq!(model.get_call().xtrans, None);
    }

    #[test]
    fn test_call_mode_derivative() {
        let mut model = line();
        model.set_call(CallConfig::derivative(1e-6));
        // slope of 2x + 1 is 2 everywhere
        assert_relative_eq!(model.at(5.0).unwrap(), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_call_mode_integral_matches_direct() {
        let mut model = line();
        model.set_call(CallConfig::integral_from_zero(IntegralKind::Linear));
        let via_call = model.at(3.0).unwrap();
        model.clear_call();
        let direct = model.integrate(0.0, 3.0, None, None, None).unwrap();
        // antiderivative of 2x + 1 from 0 to 3 is 9 + 3
        assert_relative_eq!(via_call, 12.0, epsilon = 1e-8);
        assert_relative_eq!(via_call, direct, epsilon = 1e-8);
    }

    #[test]
    fn test_integrate_stores_last_result() {
        let mut model = line();
        let v = model.integrate(0.0, 1.0, Some(IntMethod::Romberg), None, None).unwrap();
        assert_relative_eq!(v, 2.0, epsilon = 1e-8);
        assert_eq!(model.cache().last_integrate, Some(v));
    }

    #[test]
    fn test_integrate_circular_jacobian() {
        // constant 1: circular integral 0..R is pi R^2
        let spec = ModelSpec::builder("const").param("c", 1.0).build().unwrap();
        let mut model = FunctionModel1D::from_spec(&spec, None, |_, p| p[0]).unwrap();
        let v = model.integrate_circular(0.0, 2.0, None, None, None).unwrap();
        assert_relative_eq!(v, PI * 4.0, epsilon = 1e-8);

        let v = model.integrate_spherical(0.0, 2.0, None, None, None).unwrap();
        assert_relative_eq!(v, 4.0 / 3.0 * PI * 8.0, epsilon = 1e-6);
    }

    #[test]
    fn test_invert() {
        let model = line();
        // 2x + 1 = 9 at x = 4
        let x = model.invert(9.0, InvertStart::At(0.0), None).unwrap();
        assert_relative_eq!(x, 4.0, epsilon = 1e-8);

        let x = model.invert(9.0, InvertStart::Bracket(0.0, 10.0), None).unwrap();
        assert_relative_eq!(x, 4.0, epsilon = 1e-8);

        let err = model
            .invert(9.0, InvertStart::At(0.0), Some(RootMethod::Brentq))
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn test_custom_inverse_takes_priority() {
        let spec = ModelSpec::builder("line").param("m", 2.0).param("b", 1.0).build().unwrap();
        let model = FunctionModel1D::from_spec(&spec, None, |x, p| p[0] * x + p[1])
            .unwrap()
            .with_custom_inverse(|y, p| (y - p[1]) / p[0]);
        assert_relative_eq!(model.inv(9.0).unwrap(), 4.0);
    }

    #[test]
    fn test_optimize_dispatcher() {
        // parabola with minimum at x = 1
        let spec = ModelSpec::builder("parab").param("c", 1.0).build().unwrap();
        let mut model =
            FunctionModel1D::from_spec(&spec, None, |x, p| (x - p[0]) * (x - p[0]) - 4.0).unwrap();

        let xmin = model.minimize(3.0, OptimizeMethod::Simplex).unwrap();
        assert_relative_eq!(xmin, 1.0, epsilon = 1e-3);
        assert!(model.cache().last_optimize.is_some());

        let xroot = model.find_root(2.5, OptimizeMethod::Simplex).unwrap();
        assert_relative_eq!(xroot, 3.0, epsilon = 1e-3);

        let xval = model.find_value(-3.0, 1.5, OptimizeMethod::Powell).unwrap();
        assert_relative_eq!((xval - 1.0).abs(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_sample_curve_requires_limits() {
        let model = line();
        let err = model.sample_curve(None, None, &SampleOptions::default()).unwrap_err();
        assert!(matches!(err, ModelError::MissingData(_)));

        let hinted = line().with_range_hint(0.0, 1.0);
        let (xs, ys) = hinted.sample_curve(None, None, &SampleOptions::default()).unwrap();
        assert_eq!(xs.len(), 100);
        assert_relative_eq!(ys[0], 1.0);
        assert_relative_eq!(ys[99], 3.0);
    }

    #[test]
    fn test_intersect_models() {
        let a = line(); // 2x + 1
        let spec = ModelSpec::builder("const").param("c", 5.0).build().unwrap();
        let b = FunctionModel1D::from_spec(&spec, None, |_, p| p[0]).unwrap();

        let pts = intersect_models(&a, &b, Some((0.0, 10.0)), 256).unwrap();
        assert_eq!(pts.len(), 1);
        assert_relative_eq!(pts[0], 2.0, epsilon = 1e-8);
    }
}
