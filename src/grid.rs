//! Grids of same-typed models scanned by an external variable.
//!
//! A [`ModelGrid1D`] holds an ordered sequence of models of one concrete
//! type, typically produced by varying a physical quantity that is not
//! itself a model parameter (metallicity, inclination, epoch). Per-position
//! values of such quantities live in named extra arrays alongside the
//! models. The grid supports interpolation-based inversion: given an
//! observed output, recover the parameter or extra value at which the
//! scanned models would produce it.

use crate::error::{ModelError, Result};
use crate::model::FunctionModel;
use crate::model1d::{FunctionModel1D, Model1D};
use ndarray::Array1;
use std::collections::HashMap;

/// Interpolation strategies for [`ModelGrid1D::lookup_parameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridInterp {
    /// Linear interpolation of the sought value against the model outputs
    Linear,

    /// Cubic-spline interpolation
    Spline,
}

/// An ordered collection of same-typed 1-D models.
#[derive(Debug, Clone)]
pub struct ModelGrid1D {
    models: Vec<FunctionModel1D>,
    extras: HashMap<String, Vec<f64>>,
}

impl ModelGrid1D {
    /// Build a grid from a non-empty sequence of models of one type.
    ///
    /// Fails with a type mismatch if the models are not all of the same
    /// registered type, or with the same parameter names in the same
    /// order.
    pub fn new(models: Vec<FunctionModel1D>) -> Result<Self> {
        let first = models.first().ok_or_else(|| {
            ModelError::Configuration("a model grid needs at least one model".to_string())
        })?;

        let type_name = first.type_name().to_string();
        let names = first.param_names();
        for m in &models[1..] {
            if m.type_name() != type_name {
                return Err(ModelError::TypeMismatch(format!(
                    "grid models must share one type: found '{}' and '{}'",
                    type_name,
                    m.type_name()
                )));
            }
            if m.param_names() != names {
                return Err(ModelError::TypeMismatch(format!(
                    "grid models of type '{}' disagree on parameter names",
                    type_name
                )));
            }
        }

        Ok(Self {
            models,
            extras: HashMap::new(),
        })
    }

    /// The models, in grid order.
    pub fn models(&self) -> &[FunctionModel1D] {
        &self.models
    }

    /// A model by grid position.
    pub fn model(&self, index: usize) -> Option<&FunctionModel1D> {
        self.models.get(index)
    }

    /// Mutable access to a model by grid position.
    pub fn model_mut(&mut self, index: usize) -> Option<&mut FunctionModel1D> {
        self.models.get_mut(index)
    }

    /// Number of grid positions.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the grid holds no models.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// The shared type name of the grid's models.
    pub fn type_name(&self) -> &str {
        self.models[0].type_name()
    }

    /// Attach a named per-position array of non-model values.
    ///
    /// The array length must match the grid length, and the name must not
    /// shadow a model parameter.
    pub fn add_extra(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.models.len() {
            return Err(ModelError::ShapeMismatch(format!(
                "extra array '{}' has {} values for {} grid positions",
                name,
                values.len(),
                self.models.len()
            )));
        }
        if self.models[0].params().index_of(name).is_some() {
            return Err(ModelError::Configuration(format!(
                "extra name '{}' shadows a model parameter",
                name
            )));
        }
        self.extras.insert(name.to_string(), values);
        Ok(())
    }

    /// A named extra array, if attached.
    pub fn extra(&self, name: &str) -> Option<&[f64]> {
        self.extras.get(name).map(|v| v.as_slice())
    }

    /// The per-position values of a model parameter or extra array.
    fn scan_values(&self, name: &str) -> Result<Vec<f64>> {
        if let Some(values) = self.extras.get(name) {
            return Ok(values.clone());
        }
        self.models
            .iter()
            .map(|m| m.par(name))
            .collect::<Result<Vec<f64>>>()
            .map_err(|_| {
                ModelError::Lookup(format!(
                    "'{}' is neither a parameter of '{}' nor an extra array",
                    name,
                    self.type_name()
                ))
            })
    }

    /// Invert the grid: the value of `name` at which the scanned models
    /// would output `y`, independently for each query point.
    ///
    /// At each query point every model is evaluated, giving an output
    /// value per grid position; the sought values come from interpolating
    /// `name`'s per-position values at the output matching `y`. Targets
    /// outside the range the grid spans at that point are computation
    /// errors.
    pub fn lookup_parameter(
        &self,
        xs: &[f64],
        y: &Array1<f64>,
        name: &str,
        interp: GridInterp,
    ) -> Result<Array1<f64>> {
        match interp {
            GridInterp::Linear => {}
            GridInterp::Spline => {
                return Err(ModelError::NotImplemented(
                    "spline grid interpolation".to_string(),
                ))
            }
        }
        if xs.len() != y.len() {
            return Err(ModelError::ShapeMismatch(format!(
                "y array does not match x: {} vs {}",
                y.len(),
                xs.len()
            )));
        }
        if self.models.len() < 2 {
            return Err(ModelError::Configuration(
                "grid inversion needs at least two grid positions".to_string(),
            ));
        }

        let sought = self.scan_values(name)?;
        let mut out = Array1::zeros(xs.len());
        for (q, (&x, &target)) in xs.iter().zip(y.iter()).enumerate() {
            let outputs = self
                .models
                .iter()
                .map(|m| m.at(x))
                .collect::<Result<Vec<f64>>>()?;
            out[q] = interp_linear(&outputs, &sought, target).ok_or_else(|| {
                ModelError::Computation(format!(
                    "target {} at x = {} is outside the outputs the grid spans",
                    target, x
                ))
            })?;
        }
        Ok(out)
    }
}

/// Linearly interpolate `values` at the point where `outputs` crosses
/// `target`, scanning consecutive grid positions for the first bracket.
fn interp_linear(outputs: &[f64], values: &[f64], target: f64) -> Option<f64> {
    for i in 1..outputs.len() {
        let (a, b) = (outputs[i - 1], outputs[i]);
        if a == target {
            return Some(values[i - 1]);
        }
        if (a - target) * (b - target) <= 0.0 {
            if a == b {
                return Some(values[i - 1]);
            }
            let t = (target - a) / (b - a);
            return Some(values[i - 1] + t * (values[i] - values[i - 1]));
        }
    }
    None
}
