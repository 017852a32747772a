//! Parameter definition and implementation
//!
//! This module provides the Parameter struct, the fundamental building block
//! of the parameter system. A parameter is a named scalar slot owned by a
//! single model instance; its value is lazily materialized from the declared
//! default on first read.

use serde::{Deserialize, Serialize};

/// A named scalar parameter of a model.
///
/// Parameters are created from a model's parameter schema and hold the
/// current value used during evaluation and fitting. Until a value is
/// assigned, reads return the declared default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the parameter
    name: String,

    /// Default value, used until a value is assigned
    default: f64,

    /// Current value of the parameter, if one has been assigned
    value: Option<f64>,
}

impl Parameter {
    /// Create a new parameter with the given name and default value.
    ///
    /// # Examples
    ///
    /// ```
    /// use astromod::params::Parameter;
    ///
    /// let param = Parameter::new("amplitude", 10.0);
    /// assert_eq!(param.name(), "amplitude");
    /// assert_eq!(param.value(), 10.0);
    /// assert!(!param.is_set());
    /// ```
    pub fn new(name: &str, default: f64) -> Self {
        Self {
            name: name.to_string(),
            default,
            value: None,
        }
    }

    /// Get the name of the parameter.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the parameter.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Get the declared default value.
    pub fn default(&self) -> f64 {
        self.default
    }

    /// Get the current value, falling back to the default if unset.
    pub fn value(&self) -> f64 {
        self.value.unwrap_or(self.default)
    }

    /// Set the value of the parameter.
    pub fn set_value(&mut self, value: f64) {
        self.value = Some(value);
    }

    /// Whether a value has been explicitly assigned.
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Clear any assigned value, reverting reads to the default.
    pub fn reset(&mut self) {
        self.value = None;
    }
}
