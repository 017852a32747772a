//! Composite models: algebraic combinations of 1-D function models.
//!
//! A composite owns its sub-models and folds their outputs through a
//! fixed, left-to-right chain of binary operators. Composite parameter
//! names are the sub-model names suffixed by the sub-model position,
//! shortened to the bare name when unique across the whole composite and
//! optionally renamed. Parameter access routes through an explicit
//! `(sub-model, local slot)` table, so mutating a parameter through the
//! composite mutates the underlying sub-model.

use crate::error::{ModelError, Result};
use crate::model::{FitOptions, FunctionModel, ModelCache};
use crate::model1d::{eval_call, CallConfig, FunctionModel1D, Model1D};
use crate::registry::{self, ModelQuery};
use ndarray::Array1;
use std::str::FromStr;
use std::sync::Arc;

/// Binary operators usable in a composite's operator chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
        }
    }
}

impl FromStr for BinaryOp {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(BinaryOp::Add),
            "-" => Ok(BinaryOp::Sub),
            "*" => Ok(BinaryOp::Mul),
            "/" => Ok(BinaryOp::Div),
            "**" | "^" => Ok(BinaryOp::Pow),
            other => Err(ModelError::UnsupportedMethod(format!(
                "unrecognized operator '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
        };
        write!(f, "{}", s)
    }
}

type OutputFilter = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// A group of 1-D models evaluated as a single model.
///
/// Evaluation computes each sub-model's raw function with its own
/// parameters and folds the outputs left-to-right through the operator
/// chain (no precedence), then applies any registered post-evaluation
/// filters in registration order.
///
/// # Examples
///
/// ```
/// use astromod::composite::{BinaryOp, CompositeModel1D};
/// use astromod::model1d::{FunctionModel1D, Model1D};
/// use astromod::params::ModelSpec;
/// use ndarray::array;
///
/// let line = ModelSpec::builder("line").param("m", 2.0).param("b", 0.0).build().unwrap();
/// let cons = ModelSpec::builder("const").param("c", 5.0).build().unwrap();
/// let a = FunctionModel1D::from_spec(&line, None, |x, p| p[0] * x + p[1]).unwrap();
/// let b = FunctionModel1D::from_spec(&cons, None, |_, p| p[0]).unwrap();
///
/// let composite = CompositeModel1D::new(vec![a, b], vec![BinaryOp::Add]).unwrap();
/// assert_eq!(composite.eval(&array![1.0]).unwrap()[0], 7.0);
/// ```
#[derive(Clone)]
pub struct CompositeModel1D {
    models: Vec<FunctionModel1D>,
    ops: Vec<BinaryOp>,
    names: Vec<String>,
    /// Route from composite parameter position to (sub-model, local slot)
    routes: Vec<(usize, usize)>,
    /// Start of each sub-model's slice in the flat parameter vector
    offsets: Vec<usize>,
    filters: Vec<OutputFilter>,
    call: CallConfig,
    cache: ModelCache<f64>,
}

impl CompositeModel1D {
    /// Combine models with one operator between each adjacent pair, with
    /// auto-shortening and no renames.
    pub fn new(models: Vec<FunctionModel1D>, ops: Vec<BinaryOp>) -> Result<Self> {
        Self::with_renames(models, ops, &[], true)
    }

    /// Combine models with the same operator between every adjacent pair.
    pub fn with_uniform_op(models: Vec<FunctionModel1D>, op: BinaryOp) -> Result<Self> {
        let n = models.len().saturating_sub(1);
        Self::new(models, vec![op; n])
    }

    /// Full constructor: models, operator chain, parameter renames keyed
    /// by the suffixed name, and auto-shortening control.
    ///
    /// Rename targets must not collide with any existing composite
    /// parameter name. Auto-shortening drops the position suffix from
    /// names whose bare parameter name occurs in exactly one sub-model.
    pub fn with_renames(
        models: Vec<FunctionModel1D>,
        ops: Vec<BinaryOp>,
        renames: &[(&str, &str)],
        autoshorten: bool,
    ) -> Result<Self> {
        if models.is_empty() {
            return Err(ModelError::Configuration(
                "a composite needs at least one model".to_string(),
            ));
        }
        if ops.len() != models.len() - 1 {
            return Err(ModelError::Configuration(format!(
                "impossible number of operations: {} operators for {} models",
                ops.len(),
                models.len()
            )));
        }

        // Suffix every sub-model parameter with the sub-model position
        let mut names = Vec::new();
        let mut routes = Vec::new();
        let mut offsets = Vec::with_capacity(models.len());
        let mut locals = Vec::new();
        for (i, m) in models.iter().enumerate() {
            offsets.push(names.len());
            for (j, p) in m.param_names().into_iter().enumerate() {
                names.push(format!("{}{}", p, i));
                routes.push((i, j));
                locals.push(p);
            }
        }

        let mut renamed = vec![false; names.len()];
        for (old, new) in renames {
            let pos = names.iter().position(|n| n == old).ok_or_else(|| {
                ModelError::Lookup(format!("parameter '{}' not present in the composite", old))
            })?;
            if names.iter().any(|n| n == new) {
                return Err(ModelError::Configuration(format!(
                    "replacement parameter name '{}' already exists",
                    new
                )));
            }
            names[pos] = new.to_string();
            renamed[pos] = true;
        }

        if autoshorten {
            for i in 0..names.len() {
                if renamed[i] {
                    continue;
                }
                let bare = &locals[i];
                let unique = locals.iter().filter(|l| *l == bare).count() == 1;
                if unique && !names.contains(bare) {
                    names[i] = bare.clone();
                }
            }
        }

        Ok(Self {
            models,
            ops,
            names,
            routes,
            offsets,
            filters: Vec::new(),
            call: CallConfig::default(),
            cache: ModelCache::default(),
        })
    }

    /// Build a composite by instantiating registered 1-D model types.
    pub fn from_names(type_names: &[&str], ops: Vec<BinaryOp>) -> Result<Self> {
        let mut models = Vec::with_capacity(type_names.len());
        for name in type_names {
            let entry = registry::get_model(ModelQuery::Name(name))?;
            models.push(entry.instantiate(None)?.into_one_d()?);
        }
        Self::new(models, ops)
    }

    /// The sub-models, in evaluation order.
    pub fn models(&self) -> &[FunctionModel1D] {
        &self.models
    }

    /// The operator chain.
    pub fn ops(&self) -> &[BinaryOp] {
        &self.ops
    }

    /// A sub-model by position.
    pub fn model(&self, index: usize) -> Option<&FunctionModel1D> {
        self.models.get(index)
    }

    /// Mutable access to a sub-model by position. Parameter changes made
    /// here are visible through the composite.
    pub fn model_mut(&mut self, index: usize) -> Option<&mut FunctionModel1D> {
        self.models.get_mut(index)
    }

    /// Register a function applied to the output after evaluation.
    pub fn add_filter<F>(&mut self, filter: F)
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
    }

    /// Remove all registered output filters.
    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    /// Register a filter clamping the output below the given floor.
    pub fn add_lower_bound_filter(&mut self, bound: f64) {
        self.add_filter(move |v| if v < bound { bound } else { v });
    }

    /// Fit with whole sub-models fixed or free.
    ///
    /// Exactly one of `fixed_models`/`free_models` must be given; the
    /// selected groups are translated into the per-parameter fixed list of
    /// the generic fit routine.
    pub fn fit_with_groups(
        &mut self,
        xs: &[f64],
        y: &Array1<f64>,
        fixed_models: Option<&[usize]>,
        free_models: Option<&[usize]>,
        opts: &FitOptions,
    ) -> Result<Array1<f64>> {
        let fixed = match (fixed_models, free_models) {
            (Some(_), Some(_)) => {
                return Err(ModelError::Configuration(
                    "cannot give both fixed and free model groups".to_string(),
                ))
            }
            (None, None) => {
                return Err(ModelError::Configuration(
                    "must give either fixed or free model groups".to_string(),
                ))
            }
            (Some(fixed), None) => self.group_names(fixed)?,
            (None, Some(free)) => {
                let free_names = self.group_names(free)?;
                self.names
                    .iter()
                    .filter(|n| !free_names.contains(n))
                    .cloned()
                    .collect()
            }
        };

        let mut group_opts = opts.clone();
        group_opts.fixed = fixed;
        self.fit(xs, y, &group_opts)
    }

    /// Composite parameter names belonging to the given sub-models.
    fn group_names(&self, indices: &[usize]) -> Result<Vec<String>> {
        for &i in indices {
            if i >= self.models.len() {
                return Err(ModelError::Lookup(format!(
                    "model index {} out of range for {} models",
                    i,
                    self.models.len()
                )));
            }
        }
        Ok(self
            .names
            .iter()
            .zip(self.routes.iter())
            .filter(|(_, (m, _))| indices.contains(m))
            .map(|(n, _)| n.clone())
            .collect())
    }
}

impl std::fmt::Debug for CompositeModel1D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeModel1D")
            .field("models", &self.models)
            .field("ops", &self.ops)
            .field("names", &self.names)
            .finish()
    }
}

impl FunctionModel for CompositeModel1D {
    type Input = f64;

    fn param_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn par_values(&self) -> Vec<f64> {
        self.models.iter().flat_map(|m| m.par_values()).collect()
    }

    fn set_par_values(&mut self, values: &[f64]) -> Result<()> {
        if values.len() > self.names.len() {
            return Err(ModelError::Configuration(format!(
                "too many parameter values: got {}, composite has {} parameters",
                values.len(),
                self.names.len()
            )));
        }
        for (k, &v) in values.iter().enumerate() {
            let (m, j) = self.routes[k];
            self.models[m]
                .params_mut()
                .at_mut(j)
                .expect("route points at a live parameter")
                .set_value(v);
        }
        Ok(())
    }

    fn par(&self, name: &str) -> Result<f64> {
        let k = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ModelError::Lookup(format!("no parameter named '{}'", name)))?;
        let (m, j) = self.routes[k];
        Ok(self.models[m].params().at(j).expect("route points at a live parameter").value())
    }

    fn set_par(&mut self, name: &str, value: f64) -> Result<()> {
        let k = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ModelError::Lookup(format!("no parameter named '{}'", name)))?;
        let (m, j) = self.routes[k];
        self.models[m]
            .params_mut()
            .at_mut(j)
            .expect("route points at a live parameter")
            .set_value(value);
        Ok(())
    }

    fn f(&self, x: f64, pars: &[f64]) -> f64 {
        let slice = |i: usize| {
            let start = self.offsets[i];
            let end = start + self.models[i].params().len();
            &pars[start..end]
        };

        let mut acc = self.models[0].f(x, slice(0));
        for (i, op) in self.ops.iter().enumerate() {
            acc = op.apply(acc, self.models[i + 1].f(x, slice(i + 1)));
        }
        for filter in &self.filters {
            acc = filter(acc);
        }
        acc
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
}

impl Model1D for CompositeModel1D {
    fn call_config(&self) -> &CallConfig {
        &self.call
    }

    fn call_config_mut(&mut self) -> &mut CallConfig {
        &mut self.call
    }
}

fn constant_model(default: f64) -> FunctionModel1D {
    let mut params = crate::params::ParamSet::new();
    params.add_param("C", default).expect("fresh set takes one parameter");
    FunctionModel1D::new("constant", params, |_, p| p[0])
}

/// Wrap a model in a composite adding a constant offset parameter with the
/// given name.
pub fn offset_model(model: FunctionModel1D, pname: &str) -> Result<CompositeModel1D> {
    let constant = constant_model(0.0);
    CompositeModel1D::with_renames(
        vec![model, constant],
        vec![BinaryOp::Add],
        &[("C1", pname)],
        true,
    )
}

/// Wrap a model in a composite adding a constant scale parameter with the
/// given name.
pub fn scale_model(model: FunctionModel1D, pname: &str) -> Result<CompositeModel1D> {
    let constant = constant_model(1.0);
    CompositeModel1D::with_renames(
        vec![model, constant],
        vec![BinaryOp::Mul],
        &[("C1", pname)],
        true,
    )
}

/// Wrap a model in a composite adding both a scale and an offset
/// parameter: `scale * model(x) + offset`.
pub fn scale_and_offset_model(
    model: FunctionModel1D,
    scale_pname: &str,
    offset_pname: &str,
) -> Result<CompositeModel1D> {
    CompositeModel1D::with_renames(
        vec![model, constant_model(1.0), constant_model(0.0)],
        vec![BinaryOp::Mul, BinaryOp::Add],
        &[("C1", scale_pname), ("C2", offset_pname)],
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model1d::Model1D;
    use crate::params::ModelSpec;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn gaussian() -> FunctionModel1D {
        let spec = ModelSpec::builder("gaussian")
            .param("A", 1.0)
            .param("mu", 0.0)
            .param("sigma", 1.0)
            .build()
            .unwrap();
        FunctionModel1D::from_spec(&spec, None, |x, p| {
            let arg = (x - p[1]) / p[2];
            p[0] * (-0.5 * arg * arg).exp()
        })
        .unwrap()
    }

    fn line() -> FunctionModel1D {
        let spec = ModelSpec::builder("line")
            .param("m", 1.0)
            .param("b", 0.0)
            .build()
            .unwrap();
        FunctionModel1D::from_spec(&spec, None, |x, p| p[0] * x + p[1]).unwrap()
    }

    #[test]
    fn test_two_model_sum() {
        let composite = CompositeModel1D::new(vec![gaussian(), line()], vec![BinaryOp::Add]).unwrap();
        let x = array![-1.0, 0.0, 1.0, 2.0];
        let y = composite.eval(&x).unwrap();

        let g = gaussian();
        let l = line();
        let yg = g.eval(&x).unwrap();
        let yl = l.eval(&x).unwrap();
        for i in 0..x.len() {
            assert_relative_eq!(y[i], yg[i] + yl[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_left_to_right_folding() {
        // constant models 2, 3, 4 with ops (+, *): (2 + 3) * 4 = 20
        let c2 = constant_model(2.0);
        let c3 = constant_model(3.0);
        let c4 = constant_model(4.0);
        let composite =
            CompositeModel1D::new(vec![c2, c3, c4], vec![BinaryOp::Add, BinaryOp::Mul]).unwrap();
        assert_relative_eq!(composite.at(0.0).unwrap(), 20.0);
    }

    #[test]
    fn test_operation_count_validation() {
        let err = CompositeModel1D::new(vec![gaussian(), line()], vec![]).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn test_name_shortening_and_suffixing() {
        // both models share no names: everything shortens
        let composite = CompositeModel1D::new(vec![gaussian(), line()], vec![BinaryOp::Add]).unwrap();
        assert_eq!(composite.param_names(), vec!["A", "mu", "sigma", "m", "b"]);

        // two gaussians: all names clash and keep their suffixes
        let composite =
            CompositeModel1D::new(vec![gaussian(), gaussian()], vec![BinaryOp::Add]).unwrap();
        assert_eq!(
            composite.param_names(),
            vec!["A0", "mu0", "sigma0", "A1", "mu1", "sigma1"]
        );
    }

    #[test]
    fn test_renames_and_collisions() {
        let composite = CompositeModel1D::with_renames(
            vec![gaussian(), gaussian()],
            vec![BinaryOp::Add],
            &[("A0", "amp_left")],
            true,
        )
        .unwrap();
        assert!(composite.param_names().contains(&"amp_left".to_string()));

        // renaming onto an existing name fails construction
        let err = CompositeModel1D::with_renames(
            vec![gaussian(), gaussian()],
            vec![BinaryOp::Add],
            &[("A0", "mu1")],
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));

        // renaming a missing parameter is a lookup error
        let err = CompositeModel1D::with_renames(
            vec![gaussian(), gaussian()],
            vec![BinaryOp::Add],
            &[("nope", "x")],
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Lookup(_)));
    }

    #[test]
    fn test_parameter_aliasing_mutates_submodel() {
        let mut composite =
            CompositeModel1D::new(vec![gaussian(), line()], vec![BinaryOp::Add]).unwrap();
        composite.set_par("A", 7.0).unwrap();
        assert_relative_eq!(composite.model(0).unwrap().par("A").unwrap(), 7.0);

        // and the other way: mutating the sub-model shows through
        composite.model_mut(1).unwrap().set_par("m", 5.0).unwrap();
        assert_relative_eq!(composite.par("m").unwrap(), 5.0);
    }

    #[test]
    fn test_filters() {
        let mut composite = CompositeModel1D::new(vec![line()], vec![]).unwrap();
        composite.set_par("b", -10.0).unwrap();
        assert_relative_eq!(composite.at(0.0).unwrap(), -10.0);

        composite.add_lower_bound_filter(0.0);
        assert_relative_eq!(composite.at(0.0).unwrap(), 0.0);
        assert_relative_eq!(composite.at(20.0).unwrap(), 10.0);

        composite.clear_filters();
        assert_relative_eq!(composite.at(0.0).unwrap(), -10.0);
    }

    #[test]
    fn test_fit_with_groups_validation() {
        let mut composite =
            CompositeModel1D::new(vec![gaussian(), line()], vec![BinaryOp::Add]).unwrap();
        let x = vec![0.0, 1.0, 2.0];
        let y = array![1.0, 2.0, 3.0];

        let err = composite
            .fit_with_groups(&x, &y, Some(&[0]), Some(&[1]), &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));

        let err = composite
            .fit_with_groups(&x, &y, None, None, &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));

        let err = composite
            .fit_with_groups(&x, &y, Some(&[5]), None, &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::Lookup(_)));
    }

    #[test]
    fn test_scale_and_offset_helpers() {
        let model = scale_and_offset_model(gaussian(), "A_scale", "C_off").unwrap();
        let names = model.param_names();
        assert!(names.contains(&"A_scale".to_string()));
        assert!(names.contains(&"C_off".to_string()));
        assert_relative_eq!(model.par("A_scale").unwrap(), 1.0);
        assert_relative_eq!(model.par("C_off").unwrap(), 0.0);

        let mut model = model;
        model.set_par("A_scale", 2.0).unwrap();
        model.set_par("C_off", 3.0).unwrap();
        // at the gaussian peak: 2 * 1 + 3
        assert_relative_eq!(model.at(0.0).unwrap(), 5.0, epsilon = 1e-12);
    }
}
