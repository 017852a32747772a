//! Two-dimensional scalar models.
//!
//! A [`FunctionModel2D`] maps a 2-D coordinate to a scalar output. Input
//! arrays carry the two coordinates along the first axis (`2 x N`), and
//! every evaluation routes through the model's [`CoordinateTransformer`],
//! so the function can be defined in polar coordinates while data arrives
//! in cartesian form. [`SeparableModel2D`] and [`DeformedRadialModel2D`]
//! build 2-D models out of 1-D profiles. The generic fit and statistics
//! machinery applies with `[f64; 2]` points.

use crate::coords::CoordinateTransformer;
use crate::engine::{quadrature, QuadConfig};
use crate::error::{ModelError, Result};
use crate::model::{FunctionModel, ModelCache};
use crate::model1d::{FunctionModel1D, Model1D};
use crate::params::{ModelSpec, ParamSet, Parameter};
use crate::registry::{self, ModelQuery};
use ndarray::{Array1, Array2};
use std::f64::consts::PI;
use std::sync::Arc;

/// A 2-D model wrapping a pure evaluation function of two coordinates.
///
/// # Examples
///
/// ```
/// use astromod::model2d::FunctionModel2D;
/// use astromod::params::ModelSpec;
/// use ndarray::array;
///
/// let spec = ModelSpec::builder("plane").param("a", 1.0).param("b", 2.0).build().unwrap();
/// let model = FunctionModel2D::from_spec(&spec, None, |x, y, p| p[0] * x + p[1] * y).unwrap();
///
/// // two points, coordinates along the first axis
/// let input = array![[1.0, 0.0], [0.0, 1.0]];
/// let out = model.eval(&input).unwrap();
/// assert_eq!(out, array![1.0, 2.0]);
/// ```
#[derive(Clone)]
pub struct FunctionModel2D {
    type_name: String,
    params: ParamSet,
    func: Arc<dyn Fn(f64, f64, &[f64]) -> f64 + Send + Sync>,
    transformer: CoordinateTransformer,
    cache: ModelCache<[f64; 2]>,
    range_hint: Option<(f64, f64, f64, f64)>,
}

impl FunctionModel2D {
    /// Create a model from a parameter set and an evaluation function
    /// defined in cartesian coordinates.
    pub fn new<F>(type_name: &str, params: ParamSet, func: F) -> Self
    where
        F: Fn(f64, f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.to_string(),
            params,
            func: Arc::new(func),
            transformer: CoordinateTransformer::cartesian(),
            cache: ModelCache::default(),
            range_hint: None,
        }
    }

    /// Create a model from a parameter schema.
    pub fn from_spec<F>(spec: &ModelSpec, nparams: Option<usize>, func: F) -> Result<Self>
    where
        F: Fn(f64, f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        let params = spec.materialize(nparams)?;
        Ok(Self::new(spec.name(), params, func))
    }

    /// Replace the coordinate transformer.
    pub fn with_transformer(mut self, transformer: CoordinateTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    /// Declare the relevant domain `(xl, xu, yl, yu)` of the model.
    pub fn with_range_hint(mut self, xl: f64, xu: f64, yl: f64, yu: f64) -> Self {
        self.range_hint = Some((xl, xu, yl, yu));
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

    /// The model's coordinate transformer.
    pub fn transformer(&self) -> &CoordinateTransformer {
        &self.transformer
    }

    /// Mutable access to the coordinate transformer.
    pub fn transformer_mut(&mut self) -> &mut CoordinateTransformer {
        &mut self.transformer
    }

    /// The declared domain, if any.
    pub fn range_hint(&self) -> Option<(f64, f64, f64, f64)> {
        self.range_hint
    }

    /// Evaluate over a `2 x N` coordinate array, returning one output per
    /// column.
    pub fn eval(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let points = points_from_array2(x)?;
        self.eval_points(&points)
    }

    /// Evaluate one point given in the named coordinate system.
    fn eval_from(&self, system: &str, p: [f64; 2], pars: &[f64]) -> Result<f64> {
        let q = self.transformer.transform(p, Some(system), None)?;
        Ok(self.f(q, pars))
    }

    /// Integrate the model over a rectangle in cartesian coordinates.
    pub fn integrate_cartesian(
        &mut self,
        xl: f64,
        xu: f64,
        yl: f64,
        yu: f64,
        config: &QuadConfig,
    ) -> Result<f64> {
        let pars = self.par_values();
        let outer = |x: f64| -> Result<f64> {
            let inner = |y: f64| -> Result<f64> { self.eval_from("cartesian", [x, y], &pars) };
            Ok(quadrature::quad(inner, yl, yu, config)?.0)
        };
        let (value, _) = quadrature::quad(outer, xl, xu, config)?;
        self.cache_mut().last_integrate = Some(value);
        Ok(value)
    }

    /// Integrate the model over an annulus in polar coordinates, with the
    /// polar Jacobian applied.
    pub fn integrate_circular(
        &mut self,
        outer_r: f64,
        inner_r: f64,
        theta: (f64, f64),
        config: &QuadConfig,
    ) -> Result<f64> {
        let pars = self.par_values();
        let outer = |r: f64| -> Result<f64> {
            let inner = |th: f64| -> Result<f64> {
                Ok(r * self.eval_from("polar", [r, th], &pars)?)
            };
            Ok(quadrature::quad(inner, theta.0, theta.1, config)?.0)
        };
        let (value, _) = quadrature::quad(outer, inner_r, outer_r, config)?;
        self.cache_mut().last_integrate = Some(value);
        Ok(value)
    }

    /// Integrate over the full disk of radius `r`.
    pub fn integrate_disk(&mut self, r: f64, config: &QuadConfig) -> Result<f64> {
        self.integrate_circular(r, 0.0, (0.0, 2.0 * PI), config)
    }

    /// Render the model onto an `nx x ny` pixel grid covering the given
    /// rectangle.
    ///
    /// With `sampling` absent every pixel is integrated over its area;
    /// with `sampling <= 1` the model is sampled at the grid points and
    /// scaled by the pixel area; larger values supersample each pixel and
    /// average.
    pub fn pixelize(
        &mut self,
        xl: f64,
        xu: f64,
        yl: f64,
        yu: f64,
        nx: usize,
        ny: usize,
        sampling: Option<usize>,
    ) -> Result<Array2<f64>> {
        if nx == 0 || ny == 0 {
            return Err(ModelError::Configuration(
                "pixel grid must have at least one pixel per axis".to_string(),
            ));
        }

        match sampling {
            None => {
                let mut out = Array2::zeros((nx, ny));
                let dx = (xu - xl) / nx as f64;
                let dy = (yu - yl) / ny as f64;
                let config = QuadConfig {
                    tol: 1e-8,
                    ..QuadConfig::default()
                };
                for i in 0..nx {
                    for j in 0..ny {
                        let x0 = xl + i as f64 * dx;
                        let y0 = yl + j as f64 * dy;
                        out[[i, j]] = self.integrate_cartesian(x0, x0 + dx, y0, y0 + dy, &config)?;
                    }
                }
                Ok(out)
            }
            Some(s) if s <= 1 => {
                let da = ((xu - xl) / nx as f64) * ((yu - yl) / ny as f64);
                let pars = self.par_values();
                let xs = Array1::linspace(xl, xu, nx);
                let ys = Array1::linspace(yl, yu, ny);
                let mut out = Array2::zeros((nx, ny));
                for i in 0..nx {
                    for j in 0..ny {
                        out[[i, j]] = self.filtered([xs[i], ys[j]], &pars)? * da;
                    }
                }
                Ok(out)
            }
            Some(s) => {
                let da = ((xu - xl) / nx as f64) * ((yu - yl) / ny as f64);
                let pars = self.par_values();
                let fine_x = Array1::linspace(xl, xu, nx * s);
                let fine_y = Array1::linspace(yl, yu, ny * s);
                let mut out = Array2::zeros((nx, ny));
                for i in 0..nx {
                    for j in 0..ny {
                        let mut acc = 0.0;
                        for a in 0..s {
                            for b in 0..s {
                                acc += self
                                    .filtered([fine_x[i * s + a], fine_y[j * s + b]], &pars)?;
                            }
                        }
                        out[[i, j]] = acc / (s * s) as f64 * da;
                    }
                }
                Ok(out)
            }
        }
    }
}

impl std::fmt::Debug for FunctionModel2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionModel2D")
            .field("type_name", &self.type_name)
            .field("params", &self.params)
            .field("transformer", &self.transformer)
            .finish()
    }
}

impl FunctionModel for FunctionModel2D {
    type Input = [f64; 2];

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

    fn f(&self, p: [f64; 2], pars: &[f64]) -> f64 {
        (self.func)(p[0], p[1], pars)
    }

    fn filtered(&self, p: [f64; 2], pars: &[f64]) -> Result<f64> {
        let q = self.transformer.transform(p, None, None)?;
        Ok(self.f(q, pars))
    }

    fn cache(&self) -> &ModelCache<[f64; 2]> {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut ModelCache<[f64; 2]> {
        &mut self.cache
    }
}

/// A 2-D model separable into radial and angular 1-D factors.
///
/// The output is the product of a radial model evaluated on `r` and an
/// angular model evaluated on `theta`; an absent factor contributes a
/// flat 1. Input points route through the coordinate transformer into the
/// polar system the factors are defined in, so data can arrive in
/// cartesian form.
#[derive(Clone)]
pub struct SeparableModel2D {
    radial: Option<FunctionModel1D>,
    angular: Option<FunctionModel1D>,
    transformer: CoordinateTransformer,
    cache: ModelCache<[f64; 2]>,
}

impl SeparableModel2D {
    /// Combine a radial and an angular factor.
    ///
    /// Fails with a configuration error if the two factors declare a
    /// parameter of the same name.
    pub fn new(
        radial: Option<FunctionModel1D>,
        angular: Option<FunctionModel1D>,
    ) -> Result<Self> {
        check_factor_names(&radial, &angular)?;
        Ok(Self {
            radial,
            angular,
            transformer: CoordinateTransformer::new("cartesian", "polar"),
            cache: ModelCache::default(),
        })
    }

    /// Build the factors by instantiating registered 1-D model types.
    pub fn from_names(radial: Option<&str>, angular: Option<&str>) -> Result<Self> {
        let load = |name: &str| -> Result<FunctionModel1D> {
            registry::get_model(ModelQuery::Name(name))?
                .instantiate(None)?
                .into_one_d()
        };
        let radial = radial.map(load).transpose()?;
        let angular = angular.map(load).transpose()?;
        Self::new(radial, angular)
    }

    /// Replace the coordinate transformer.
    pub fn with_transformer(mut self, transformer: CoordinateTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    /// The radial factor, if present.
    pub fn radial(&self) -> Option<&FunctionModel1D> {
        self.radial.as_ref()
    }

    /// The angular factor, if present.
    pub fn angular(&self) -> Option<&FunctionModel1D> {
        self.angular.as_ref()
    }

    /// Replace the radial factor, revalidating parameter names.
    pub fn set_radial(&mut self, radial: Option<FunctionModel1D>) -> Result<()> {
        check_factor_names(&radial, &self.angular)?;
        self.radial = radial;
        Ok(())
    }

    /// Replace the angular factor, revalidating parameter names.
    pub fn set_angular(&mut self, angular: Option<FunctionModel1D>) -> Result<()> {
        check_factor_names(&self.radial, &angular)?;
        self.angular = angular;
        Ok(())
    }

    /// The relevant domain inferred from the radial factor's range hint,
    /// assuming the angular factor is not localized.
    pub fn range_hint(&self) -> Option<(f64, f64, f64, f64)> {
        let (_, hi) = self.radial.as_ref()?.range_hint()?;
        Some((-hi, hi, -hi, hi))
    }

    /// Evaluate over a `2 x N` coordinate array, returning one output per
    /// column.
    pub fn eval(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let points = points_from_array2(x)?;
        self.eval_points(&points)
    }

    fn n_radial(&self) -> usize {
        self.radial.as_ref().map_or(0, |m| m.params().len())
    }
}

fn check_factor_names(
    radial: &Option<FunctionModel1D>,
    angular: &Option<FunctionModel1D>,
) -> Result<()> {
    if let (Some(r), Some(t)) = (radial, angular) {
        for name in r.param_names() {
            if t.params().index_of(&name).is_some() {
                return Err(ModelError::Configuration(format!(
                    "radial and angular factors both declare a parameter '{}'",
                    name
                )));
            }
        }
    }
    Ok(())
}

impl std::fmt::Debug for SeparableModel2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeparableModel2D")
            .field("radial", &self.radial)
            .field("angular", &self.angular)
            .finish()
    }
}

impl FunctionModel for SeparableModel2D {
    type Input = [f64; 2];

    fn param_names(&self) -> Vec<String> {
        let mut names = self.radial.as_ref().map_or(Vec::new(), |m| m.param_names());
        if let Some(t) = &self.angular {
            names.extend(t.param_names());
        }
        names
    }

    fn par_values(&self) -> Vec<f64> {
        let mut values = self.radial.as_ref().map_or(Vec::new(), |m| m.par_values());
        if let Some(t) = &self.angular {
            values.extend(t.par_values());
        }
        values
    }

    fn set_par_values(&mut self, values: &[f64]) -> Result<()> {
        let nr = self.n_radial();
        let total = nr + self.angular.as_ref().map_or(0, |m| m.params().len());
        if values.len() > total {
            return Err(ModelError::Configuration(format!(
                "too many parameter values: got {}, model has {} parameters",
                values.len(),
                total
            )));
        }
        let split = values.len().min(nr);
        if let Some(r) = &mut self.radial {
            r.set_par_values(&values[..split])?;
        }
        if let Some(t) = &mut self.angular {
            t.set_par_values(&values[split..])?;
        }
        Ok(())
    }

    fn par(&self, name: &str) -> Result<f64> {
        if let Some(r) = &self.radial {
            if r.params().index_of(name).is_some() {
                return r.par(name);
            }
        }
        if let Some(t) = &self.angular {
            if t.params().index_of(name).is_some() {
                return t.par(name);
            }
        }
        Err(ModelError::Lookup(format!("no parameter named '{}'", name)))
    }

    fn set_par(&mut self, name: &str, value: f64) -> Result<()> {
        if let Some(r) = &mut self.radial {
            if r.params().index_of(name).is_some() {
                return r.set_par(name, value);
            }
        }
        if let Some(t) = &mut self.angular {
            if t.params().index_of(name).is_some() {
                return t.set_par(name, value);
            }
        }
        Err(ModelError::Lookup(format!("no parameter named '{}'", name)))
    }

    fn f(&self, p: [f64; 2], pars: &[f64]) -> f64 {
        let nr = self.n_radial();
        let r = self.radial.as_ref().map_or(1.0, |m| m.f(p[0], &pars[..nr]));
        let t = self.angular.as_ref().map_or(1.0, |m| m.f(p[1], &pars[nr..]));
        r * t
    }

    fn filtered(&self, p: [f64; 2], pars: &[f64]) -> Result<f64> {
        let q = self.transformer.transform(p, None, None)?;
        Ok(self.f(q, pars))
    }

    fn cache(&self) -> &ModelCache<[f64; 2]> {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut ModelCache<[f64; 2]> {
        &mut self.cache
    }
}

/// A radial profile flattened along one axis.
///
/// The model evaluates a 1-D radial profile on an elliptical radius: the
/// plane is rotated by the position angle `pa` (radians, x-axis toward
/// y-axis) and compressed by the major-to-minor axis ratio `atob` along
/// the rotated x direction. `atob` and `pa` are ordinary model parameters
/// appended after the radial profile's own, so fits can vary the shape
/// alongside the profile. Input is cartesian.
#[derive(Clone)]
pub struct DeformedRadialModel2D {
    radial: FunctionModel1D,
    atob: Parameter,
    pa: Parameter,
    cache: ModelCache<[f64; 2]>,
}

impl DeformedRadialModel2D {
    /// Wrap a radial profile with the given axis ratio and position angle.
    ///
    /// Fails with a configuration error if the profile already declares a
    /// parameter named `atob` or `pa`.
    pub fn new(radial: FunctionModel1D, atob: f64, pa: f64) -> Result<Self> {
        for name in ["atob", "pa"] {
            if radial.params().index_of(name).is_some() {
                return Err(ModelError::Configuration(format!(
                    "radial profile already declares a parameter '{}'",
                    name
                )));
            }
        }
        let mut atob_par = Parameter::new("atob", 1.0);
        atob_par.set_value(atob);
        let mut pa_par = Parameter::new("pa", 0.0);
        pa_par.set_value(pa);
        Ok(Self {
            radial,
            atob: atob_par,
            pa: pa_par,
            cache: ModelCache::default(),
        })
    }

    /// Wrap a registered 1-D model type.
    pub fn from_name(radial: &str, atob: f64, pa: f64) -> Result<Self> {
        let model = registry::get_model(ModelQuery::Name(radial))?
            .instantiate(None)?
            .into_one_d()?;
        Self::new(model, atob, pa)
    }

    /// The underlying radial profile.
    pub fn radial(&self) -> &FunctionModel1D {
        &self.radial
    }

    /// Mutable access to the radial profile.
    pub fn radial_mut(&mut self) -> &mut FunctionModel1D {
        &mut self.radial
    }

    /// The major-to-minor axis ratio.
    pub fn axis_ratio(&self) -> f64 {
        self.atob.value()
    }

    /// The position angle in radians.
    pub fn position_angle(&self) -> f64 {
        self.pa.value()
    }

    /// The inclination angle in radians that maps onto the axis ratio.
    pub fn inclination(&self) -> f64 {
        (1.0 / self.atob.value()).acos()
    }

    /// Set the axis ratio from an inclination angle in radians.
    pub fn set_inclination(&mut self, inc: f64) {
        self.atob.set_value(1.0 / inc.cos());
    }

    /// The relevant domain inferred from the radial profile's range hint.
    pub fn range_hint(&self) -> Option<(f64, f64, f64, f64)> {
        let (_, hi) = self.radial.range_hint()?;
        Some((-hi, hi, -hi, hi))
    }

    /// Evaluate over a `2 x N` coordinate array, returning one output per
    /// column.
    pub fn eval(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let points = points_from_array2(x)?;
        self.eval_points(&points)
    }
}

impl std::fmt::Debug for DeformedRadialModel2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeformedRadialModel2D")
            .field("radial", &self.radial)
            .field("atob", &self.atob.value())
            .field("pa", &self.pa.value())
            .finish()
    }
}

impl FunctionModel for DeformedRadialModel2D {
    type Input = [f64; 2];

    fn param_names(&self) -> Vec<String> {
        let mut names = self.radial.param_names();
        names.push(self.atob.name().to_string());
        names.push(self.pa.name().to_string());
        names
    }

    fn par_values(&self) -> Vec<f64> {
        let mut values = self.radial.par_values();
        values.push(self.atob.value());
        values.push(self.pa.value());
        values
    }

    fn set_par_values(&mut self, values: &[f64]) -> Result<()> {
        let nr = self.radial.params().len();
        if values.len() > nr + 2 {
            return Err(ModelError::Configuration(format!(
                "too many parameter values: got {}, model has {} parameters",
                values.len(),
                nr + 2
            )));
        }
        let split = values.len().min(nr);
        self.radial.set_par_values(&values[..split])?;
        if values.len() > nr {
            self.atob.set_value(values[nr]);
        }
        if values.len() > nr + 1 {
            self.pa.set_value(values[nr + 1]);
        }
        Ok(())
    }

    fn par(&self, name: &str) -> Result<f64> {
        if self.radial.params().index_of(name).is_some() {
            return self.radial.par(name);
        }
        match name {
            "atob" => Ok(self.atob.value()),
            "pa" => Ok(self.pa.value()),
            _ => Err(ModelError::Lookup(format!("no parameter named '{}'", name))),
        }
    }

    fn set_par(&mut self, name: &str, value: f64) -> Result<()> {
        if self.radial.params().index_of(name).is_some() {
            return self.radial.set_par(name, value);
        }
        match name {
            "atob" => {
                self.atob.set_value(value);
                Ok(())
            }
            "pa" => {
                self.pa.set_value(value);
                Ok(())
            }
            _ => Err(ModelError::Lookup(format!("no parameter named '{}'", name))),
        }
    }

    fn f(&self, p: [f64; 2], pars: &[f64]) -> f64 {
        let nr = pars.len() - 2;
        let atob = pars[nr];
        let pa = pars[nr + 1];
        let [x, y] = p;
        let (sin_pa, cos_pa) = pa.sin_cos();
        let xr = -sin_pa * x + cos_pa * y;
        let yr = (cos_pa * x + sin_pa * y) / atob;
        self.radial.f(xr.hypot(yr), &pars[..nr])
    }

    fn cache(&self) -> &ModelCache<[f64; 2]> {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut ModelCache<[f64; 2]> {
        &mut self.cache
    }
}

/// Split a `2 x N` coordinate array into points.
///
/// Fails with a shape mismatch unless the first axis has length 2.
pub fn points_from_array2(x: &Array2<f64>) -> Result<Vec<[f64; 2]>> {
    if x.nrows() != 2 {
        return Err(ModelError::ShapeMismatch(format!(
            "2D model input must have first dimension of length 2, got {}",
            x.nrows()
        )));
    }
    Ok((0..x.ncols()).map(|i| [x[[0, i]], x[[1, i]]]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn radial() -> FunctionModel2D {
        // f(r) = exp(-r) defined in polar coordinates, fed cartesian input
        let spec = ModelSpec::builder("expdisk").param("scale", 1.0).build().unwrap();
        FunctionModel2D::from_spec(&spec, None, |r, _theta, p| (-r / p[0]).exp())
            .unwrap()
            .with_transformer(CoordinateTransformer::new("cartesian", "polar"))
    }

    #[test]
    fn test_eval_shape_validation() {
        let model = radial();
        let bad = Array2::zeros((3, 4));
        assert!(matches!(
            model.eval(&bad).unwrap_err(),
            ModelError::ShapeMismatch(_)
        ));
    }

    #[test]
    fn test_coordinate_transformed_evaluation() {
        let model = radial();
        // the point (3, 4) has radius 5
        let out = model.eval(&array![[3.0], [4.0]]).unwrap();
        assert_relative_eq!(out[0], (-5.0_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_integrate_cartesian_plane() {
        let spec = ModelSpec::builder("plane").param("a", 1.0).build().unwrap();
        let mut model = FunctionModel2D::from_spec(&spec, None, |x, y, p| p[0] * x * y).unwrap();
        // integral of xy over [0,1]^2 is 1/4
        let v = model
            .integrate_cartesian(0.0, 1.0, 0.0, 1.0, &QuadConfig::default())
            .unwrap();
        assert_relative_eq!(v, 0.25, epsilon = 1e-8);
        assert_eq!(model.cache().last_integrate, Some(v));
    }

    #[test]
    fn test_integrate_disk_constant() {
        let spec = ModelSpec::builder("flat").param("c", 3.0).build().unwrap();
        let mut model = FunctionModel2D::from_spec(&spec, None, |_x, _y, p| p[0])
            .unwrap()
            .with_transformer(CoordinateTransformer::new("cartesian", "polar"));
        // constant 3 over a disk of radius 2: 3 * pi * 4
        let v = model.integrate_disk(2.0, &QuadConfig::default()).unwrap();
        assert_relative_eq!(v, 12.0 * PI, epsilon = 1e-6);
    }

    #[test]
    fn test_pixelize_sampled_vs_integrated() {
        let spec = ModelSpec::builder("flat").param("c", 2.0).build().unwrap();
        let mut model = FunctionModel2D::from_spec(&spec, None, |_x, _y, p| p[0]).unwrap();

        let sampled = model.pixelize(0.0, 1.0, 0.0, 1.0, 4, 4, Some(1)).unwrap();
        assert_eq!(sampled.dim(), (4, 4));
        // constant 2 times pixel area 1/16
        assert_relative_eq!(sampled[[0, 0]], 2.0 / 16.0, epsilon = 1e-12);

        let integrated = model.pixelize(0.0, 1.0, 0.0, 1.0, 2, 2, None).unwrap();
        assert_relative_eq!(integrated[[1, 1]], 2.0 * 0.25, epsilon = 1e-6);
    }

    fn exp_profile() -> FunctionModel1D {
        let spec = ModelSpec::builder("expprof").param("scale", 1.0).build().unwrap();
        FunctionModel1D::from_spec(&spec, None, |r, p| (-r / p[0]).exp()).unwrap()
    }

    #[test]
    fn test_separable_product_of_factors() {
        let angular_spec = ModelSpec::builder("lobes").param("k", 2.0).build().unwrap();
        let angular =
            FunctionModel1D::from_spec(&angular_spec, None, |th, p| {
                p[0] * th.cos() * th.cos()
            })
            .unwrap();

        let model = SeparableModel2D::new(Some(exp_profile()), Some(angular)).unwrap();
        assert_eq!(model.param_names(), vec!["scale", "k"]);

        // on the positive x axis theta is 0, so the angular factor is k
        let out = model.eval(&array![[2.0], [0.0]]).unwrap();
        assert_relative_eq!(out[0], 2.0 * (-2.0_f64).exp(), epsilon = 1e-12);

        // an absent angular factor contributes a flat 1
        let radial_only = SeparableModel2D::new(Some(exp_profile()), None).unwrap();
        let out = radial_only.eval(&array![[3.0], [4.0]]).unwrap();
        assert_relative_eq!(out[0], (-5.0_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_separable_rejects_clashing_factor_names() {
        let err = SeparableModel2D::new(Some(exp_profile()), Some(exp_profile())).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn test_separable_routes_parameters_to_factors() {
        let angular_spec = ModelSpec::builder("flatang").param("g", 1.0).build().unwrap();
        let angular =
            FunctionModel1D::from_spec(&angular_spec, None, |_, p| p[0]).unwrap();
        let mut model = SeparableModel2D::new(Some(exp_profile()), Some(angular)).unwrap();

        model.set_par("g", 3.0).unwrap();
        assert_relative_eq!(model.angular().unwrap().par("g").unwrap(), 3.0);

        model.set_par_values(&[0.5, 2.0]).unwrap();
        assert_relative_eq!(model.radial().unwrap().par("scale").unwrap(), 0.5);
        assert_relative_eq!(model.par("g").unwrap(), 2.0);

        assert!(matches!(
            model.set_par("nope", 0.0).unwrap_err(),
            ModelError::Lookup(_)
        ));
    }

    #[test]
    fn test_deformed_radial_elliptical_radius() {
        // circular case: plain radial profile
        let round = DeformedRadialModel2D::new(exp_profile(), 1.0, 0.0).unwrap();
        let out = round.eval(&array![[3.0], [4.0]]).unwrap();
        assert_relative_eq!(out[0], (-5.0_f64).exp(), epsilon = 1e-12);

        // atob = 2 with pa = 0 compresses the x direction
        let flat = DeformedRadialModel2D::new(exp_profile(), 2.0, 0.0).unwrap();
        let out = flat.eval(&array![[2.0, 0.0], [0.0, 2.0]]).unwrap();
        assert_relative_eq!(out[0], (-1.0_f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(out[1], (-2.0_f64).exp(), epsilon = 1e-12);

        assert_eq!(flat.param_names(), vec!["scale", "atob", "pa"]);
        assert_relative_eq!(flat.par("atob").unwrap(), 2.0);
    }

    #[test]
    fn test_deformed_radial_inclination_mapping() {
        let mut model = DeformedRadialModel2D::new(exp_profile(), 2.0, 0.0).unwrap();
        assert_relative_eq!(model.inclination(), (0.5_f64).acos(), epsilon = 1e-12);

        model.set_inclination(0.0);
        assert_relative_eq!(model.axis_ratio(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_deformed_radial_name_collision() {
        let spec = ModelSpec::builder("bad").param("pa", 0.0).build().unwrap();
        let radial = FunctionModel1D::from_spec(&spec, None, |r, _| r).unwrap();
        let err = DeformedRadialModel2D::new(radial, 1.0, 0.0).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn test_generic_fit_machinery_applies() {
        use crate::model::FitOptions;

        // fit the plane a*x + b*y to exact data
        let spec = ModelSpec::builder("plane")
            .param("a", 0.5)
            .param("b", 0.5)
            .build()
            .unwrap();
        let mut model =
            FunctionModel2D::from_spec(&spec, None, |x, y, p| p[0] * x + p[1] * y).unwrap();

        let points: Vec<[f64; 2]> = vec![[0.0, 1.0], [1.0, 0.0], [1.0, 1.0], [2.0, 1.0], [1.0, 2.0]];
        let y = Array1::from_iter(points.iter().map(|p| 2.0 * p[0] + 3.0 * p[1]));

        let best = model.fit(&points, &y, &FitOptions::default()).unwrap();
        assert_relative_eq!(best[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(best[1], 3.0, epsilon = 1e-6);
        assert_relative_eq!(model.par("a").unwrap(), 2.0, epsilon = 1e-6);
    }
}
