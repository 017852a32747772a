//! Parameter collection implementation
//!
//! This module provides the ParamSet struct, an ordered collection of
//! Parameter objects with unique names. The order is the authoritative
//! parameter order of the owning model: value vectors produced for and
//! consumed from the numeric engine always follow it.

use crate::error::{ModelError, Result};
use crate::params::parameter::Parameter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An ordered collection of named parameters.
///
/// Parameter names are unique within one set, and the declaration order is
/// preserved; `names()` and `values()` are always parallel sequences.
///
/// # Examples
///
/// ```
/// use astromod::params::ParamSet;
///
/// let mut params = ParamSet::new();
/// params.add_param("a", 2.0).unwrap();
/// params.add_param("b", 3.0).unwrap();
/// assert_eq!(params.names(), vec!["a", "b"]);
/// assert_eq!(params.values(), vec![2.0, 3.0]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamSet {
    params: Vec<Parameter>,
}

impl ParamSet {
    /// Create a new empty parameter set.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Create a set from a sequence of parameters.
    ///
    /// Fails with a configuration error if two parameters share a name.
    pub fn with_params(params: Vec<Parameter>) -> Result<Self> {
        let mut set = Self::new();
        for p in params {
            set.add(p)?;
        }
        Ok(set)
    }

    /// Add a parameter to the set.
    ///
    /// Fails with a configuration error if a parameter with the same name
    /// already exists.
    pub fn add(&mut self, param: Parameter) -> Result<()> {
        if self.index_of(param.name()).is_some() {
            return Err(ModelError::Configuration(format!(
                "duplicate parameter name '{}'",
                param.name()
            )));
        }
        self.params.push(param);
        Ok(())
    }

    /// Add a new parameter with the given name and default value.
    pub fn add_param(&mut self, name: &str, default: f64) -> Result<()> {
        self.add(Parameter::new(name, default))
    }

    /// Number of parameters in the set.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over the parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Get a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// Get a mutable reference to a parameter by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    /// Get a parameter by position.
    pub fn at(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    /// Get a mutable reference to a parameter by position.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut Parameter> {
        self.params.get_mut(index)
    }

    /// Position of the named parameter, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name() == name)
    }

    /// The parameter names, in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name().to_string()).collect()
    }

    /// The current parameter values, in declaration order.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value()).collect()
    }

    /// Assign values positionally, in declaration order.
    ///
    /// Fewer values than parameters assigns a prefix; more values than
    /// parameters is a configuration error.
    pub fn set_values(&mut self, values: &[f64]) -> Result<()> {
        if values.len() > self.params.len() {
            return Err(ModelError::Configuration(format!(
                "too many parameter values: got {}, model has {} parameters",
                values.len(),
                self.params.len()
            )));
        }
        for (p, &v) in self.params.iter_mut().zip(values.iter()) {
            p.set_value(v);
        }
        Ok(())
    }

    /// Current value of the named parameter.
    pub fn value_of(&self, name: &str) -> Result<f64> {
        self.get(name)
            .map(|p| p.value())
            .ok_or_else(|| ModelError::Lookup(format!("no parameter named '{}'", name)))
    }

    /// Set the value of the named parameter.
    pub fn set_value_of(&mut self, name: &str, value: f64) -> Result<()> {
        match self.get_mut(name) {
            Some(p) => {
                p.set_value(value);
                Ok(())
            }
            None => Err(ModelError::Lookup(format!(
                "no parameter named '{}'",
                name
            ))),
        }
    }

    /// A name -> value map of the current parameter values.
    pub fn pardict(&self) -> HashMap<String, f64> {
        self.params
            .iter()
            .map(|p| (p.name().to_string(), p.value()))
            .collect()
    }

    /// Assign values by name.
    ///
    /// Names absent from the set fail with a lookup error; parameters not
    /// mentioned keep their current values.
    pub fn set_pardict(&mut self, values: &HashMap<String, f64>) -> Result<()> {
        for name in values.keys() {
            if self.index_of(name).is_none() {
                return Err(ModelError::Lookup(format!(
                    "no parameter named '{}'",
                    name
                )));
            }
        }
        for (name, &v) in values.iter() {
            self.set_value_of(name, v)?;
        }
        Ok(())
    }

    /// Serialize the set to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a set from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let set: ParamSet = serde_json::from_str(json)?;
        // Re-validate the uniqueness invariant for hand-edited input
        let mut seen = std::collections::HashSet::new();
        for p in set.iter() {
            if !seen.insert(p.name().to_string()) {
                return Err(ModelError::Configuration(format!(
                    "duplicate parameter name '{}' in JSON input",
                    p.name()
                )));
            }
        }
        Ok(set)
    }

    /// Write the set as JSON to a file.
    pub fn save_json(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a set from a JSON file.
    pub fn load_json(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> ParamSet {
        let mut params = ParamSet::new();
        params.add_param("a", 2.0).unwrap();
        params.add_param("b", 3.0).unwrap();
        params.add_param("c", 1.0).unwrap();
        params
    }

    #[test]
    fn test_names_values_parallel() {
        let params = sample_set();
        assert_eq!(params.names().len(), params.values().len());
        assert_eq!(params.values(), vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut params = sample_set();
        let err = params.add_param("a", 0.0).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn test_set_values_too_many() {
        let mut params = sample_set();
        let err = params.set_values(&[1.0, 2.0, 3.0, 4.0]).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
        // prefix assignment is allowed
        params.set_values(&[9.0]).unwrap();
        assert_eq!(params.values(), vec![9.0, 3.0, 1.0]);
    }

    #[test]
    fn test_pardict_round_trip() {
        let mut params = sample_set();
        let mut d = HashMap::new();
        d.insert("a".to_string(), 10.0);
        d.insert("b".to_string(), 20.0);
        d.insert("c".to_string(), 30.0);

        params.set_pardict(&d).unwrap();
        assert_eq!(params.pardict(), d);
    }

    #[test]
    fn test_pardict_unknown_name() {
        let mut params = sample_set();
        let mut d = HashMap::new();
        d.insert("nope".to_string(), 1.0);
        let err = params.set_pardict(&d).unwrap_err();
        assert!(matches!(err, ModelError::Lookup(_)));
        // nothing was mutated
        assert_eq!(params.values(), vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_json_round_trip() {
        let mut params = sample_set();
        params.set_value_of("b", 42.0).unwrap();

        let json = params.to_json().unwrap();
        let restored = ParamSet::from_json(&json).unwrap();

        assert_eq!(restored.names(), params.names());
        assert_eq!(restored.values(), params.values());
    }
}
