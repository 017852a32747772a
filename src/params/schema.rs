//! Declarative parameter schemas for model types.
//!
//! A `ModelSpec` describes the parameter list of a model type: an ordered
//! sequence of named slots with defaults, optionally followed by an
//! open-arity block whose slots are generated from name templates at
//! construction time. It replaces runtime signature inspection with an
//! explicit declaration made once per model type, and a factory step that
//! validates and applies initial values.
//!
//! # Examples
//!
//! ```
//! use astromod::params::ModelSpec;
//!
//! // Fixed arity: f(x, a, b)
//! let spec = ModelSpec::builder("line")
//!     .param("a", 2.0)
//!     .param("b", 3.0)
//!     .build()
//!     .unwrap();
//! let params = spec.materialize(None).unwrap();
//! assert_eq!(params.names(), vec!["a", "b"]);
//!
//! // Open arity: f(x, scale, p0, p1, ...)
//! let spec = ModelSpec::builder("poly")
//!     .param("scale", 1.0)
//!     .open_arity("p")
//!     .build()
//!     .unwrap();
//! let params = spec.materialize(Some(3)).unwrap();
//! assert_eq!(params.names(), vec!["scale", "p0", "p1", "p2"]);
//! ```

use crate::error::{ModelError, Result};
use crate::params::parameter::Parameter;
use crate::params::set::ParamSet;
use std::collections::HashMap;

/// Default value for generated open-arity parameters with no declared
/// override.
pub const DEFAULT_PARVAL: f64 = 1.0;

#[derive(Debug, Clone)]
struct VariadicSpec {
    /// Name templates cycled for each generated index
    templates: Vec<String>,
    /// Default overrides keyed by generated name (e.g. "p0")
    defaults: HashMap<String, f64>,
}

/// The parameter schema of a model type.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    name: String,
    fixed: Vec<(String, f64)>,
    variadic: Option<VariadicSpec>,
}

impl ModelSpec {
    /// Start building a schema for the named model type.
    pub fn builder(name: &str) -> ModelSpecBuilder {
        ModelSpecBuilder {
            name: name.to_string(),
            fixed: Vec::new(),
            templates: Vec::new(),
            variadic_defaults: HashMap::new(),
        }
    }

    /// The model type name this schema belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the schema declares an open-arity parameter block.
    pub fn has_open_arity(&self) -> bool {
        self.variadic.is_some()
    }

    /// Names of the fixed (non-generated) parameters, in order.
    pub fn static_names(&self) -> Vec<String> {
        self.fixed.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Materialize a parameter set from the schema.
    ///
    /// For open-arity schemas `nparams` gives the number of generated index
    /// groups and is required; for fixed-arity schemas it must be omitted.
    pub fn materialize(&self, nparams: Option<usize>) -> Result<ParamSet> {
        let mut set = ParamSet::new();
        for (name, default) in &self.fixed {
            set.add(Parameter::new(name, *default))?;
        }

        match (&self.variadic, nparams) {
            (Some(var), Some(n)) => {
                for i in 0..n {
                    for template in &var.templates {
                        let name = format!("{}{}", template, i);
                        let default = var.defaults.get(&name).copied().unwrap_or(DEFAULT_PARVAL);
                        set.add(Parameter::new(&name, default))?;
                    }
                }
            }
            (Some(_), None) => {
                return Err(ModelError::Configuration(format!(
                    "model '{}' has an open parameter list and requires an explicit count",
                    self.name
                )));
            }
            (None, Some(_)) => {
                return Err(ModelError::Configuration(format!(
                    "model '{}' has a fixed parameter list and takes no count",
                    self.name
                )));
            }
            (None, None) => {}
        }

        Ok(set)
    }

    /// Materialize a parameter set and apply initial values.
    ///
    /// Named values consume their slots first; positional values then fill
    /// the remaining slots in declaration order. Supplying more values than
    /// there are parameters is a configuration error, and unknown names are
    /// lookup errors; in either case no parameter set is produced.
    pub fn instantiate(
        &self,
        nparams: Option<usize>,
        positional: &[f64],
        named: &[(&str, f64)],
    ) -> Result<ParamSet> {
        let mut set = self.materialize(nparams)?;

        if positional.len() + named.len() > set.len() {
            return Err(ModelError::Configuration(format!(
                "too many initial values for the parameters: got {}, model '{}' has {}",
                positional.len() + named.len(),
                self.name,
                set.len()
            )));
        }

        let mut open: Vec<String> = set.names();
        for (name, value) in named {
            let pos = open.iter().position(|n| n == name).ok_or_else(|| {
                ModelError::Lookup(format!(
                    "no parameter named '{}' in model '{}'",
                    name, self.name
                ))
            })?;
            open.remove(pos);
            set.set_value_of(name, *value)?;
        }

        for (name, &value) in open.iter().zip(positional.iter()) {
            set.set_value_of(name, value)?;
        }

        Ok(set)
    }
}

/// Builder for [`ModelSpec`].
#[derive(Debug, Clone)]
pub struct ModelSpecBuilder {
    name: String,
    fixed: Vec<(String, f64)>,
    templates: Vec<String>,
    variadic_defaults: HashMap<String, f64>,
}

impl ModelSpecBuilder {
    /// Declare a fixed parameter with the given default value.
    pub fn param(mut self, name: &str, default: f64) -> Self {
        self.fixed.push((name.to_string(), default));
        self
    }

    /// Declare an open-arity block generating names from one template
    /// prefix (`"p"` yields `p0`, `p1`, ...).
    pub fn open_arity(mut self, template: &str) -> Self {
        self.templates.push(template.to_string());
        self
    }

    /// Declare an open-arity block cycling several templates per index
    /// (`["a", "b"]` yields `a0`, `b0`, `a1`, `b1`, ...).
    pub fn open_arity_cycled(mut self, templates: &[&str]) -> Self {
        self.templates
            .extend(templates.iter().map(|t| t.to_string()));
        self
    }

    /// Override the default value of one generated parameter, keyed by its
    /// generated name (e.g. `"p0"`).
    pub fn open_default(mut self, generated_name: &str, default: f64) -> Self {
        self.variadic_defaults
            .insert(generated_name.to_string(), default);
        self
    }

    /// Finish the schema, validating name uniqueness and template use.
    pub fn build(self) -> Result<ModelSpec> {
        let mut seen = std::collections::HashSet::new();
        for (name, _) in &self.fixed {
            if !seen.insert(name.clone()) {
                return Err(ModelError::Configuration(format!(
                    "duplicate parameter name '{}' in schema '{}'",
                    name, self.name
                )));
            }
        }

        if self.templates.is_empty() && !self.variadic_defaults.is_empty() {
            return Err(ModelError::Configuration(format!(
                "schema '{}' declares open-arity defaults without an open-arity block",
                self.name
            )));
        }

        let variadic = if self.templates.is_empty() {
            None
        } else {
            Some(VariadicSpec {
                templates: self.templates,
                defaults: self.variadic_defaults,
            })
        };

        Ok(ModelSpec {
            name: self.name,
            fixed: self.fixed,
            variadic,
        })
    }
}
