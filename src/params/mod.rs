//! # Parameter System
//!
//! This module provides the parameter system used by every model in the
//! crate: named scalar parameters with lazy defaults, ordered collections
//! with a dictionary projection, and declarative per-type schemas that
//! replace runtime signature inspection.
//!
//! ## Core Components
//!
//! - [`Parameter`]: a single named slot with a default and a current value
//! - [`ParamSet`]: an ordered, name-unique collection with positional and
//!   named access and JSON persistence
//! - [`ModelSpec`]: the declarative parameter schema of a model type,
//!   including open-arity blocks with name templating
//!
//! ## Example Usage
//!
//! ```rust
//! use astromod::params::ModelSpec;
//!
//! let spec = ModelSpec::builder("gaussian")
//!     .param("amplitude", 1.0)
//!     .param("center", 0.0)
//!     .param("sigma", 1.0)
//!     .build()
//!     .unwrap();
//!
//! let mut params = spec.instantiate(None, &[], &[("amplitude", 3.0)]).unwrap();
//! assert_eq!(params.value_of("amplitude").unwrap(), 3.0);
//!
//! params.set_value_of("sigma", 0.5).unwrap();
//! assert_eq!(params.values(), vec![3.0, 0.0, 0.5]);
//! ```

pub mod parameter;
pub mod schema;
pub mod set;

// Re-export key types
pub use parameter::Parameter;
pub use schema::{ModelSpec, ModelSpecBuilder, DEFAULT_PARVAL};
pub use set::ParamSet;
