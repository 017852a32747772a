//! # astromod
//!
//! `astromod` is a parametric-model framework for fitting 1-D and 2-D
//! scalar functions to observational data, built for astronomy toolkits.
//!
//! The library provides:
//! - A declarative parameter system: named scalar slots with lazy
//!   defaults, ordered sets, and per-type schemas with open-arity blocks
//! - Function models wrapping arbitrary evaluation functions, with
//!   fitting, statistics, call-mode redirection, integration, derivatives,
//!   and inversion
//! - Composite models combining sub-models through an operator chain
//! - Model grids with interpolation-based inversion across a scan variable
//! - Coordinate-transformed 2-D models and a process-wide model registry
//!
//! ## Basic Usage
//!
//! ```
//! use astromod::model::{FitOptions, FunctionModel};
//! use astromod::model1d::FunctionModel1D;
//! use astromod::params::ModelSpec;
//! use ndarray::Array1;
//!
//! // Declare the parameter schema and wrap the evaluation function
//! let spec = ModelSpec::builder("line")
//!     .param("m", 1.0)
//!     .param("b", 0.0)
//!     .build()
//!     .unwrap();
//! let mut model = FunctionModel1D::from_spec(&spec, None, |x, p| p[0] * x + p[1]).unwrap();
//!
//! // Fit to data drawn from m = 2, b = 1
//! let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
//! let y = Array1::from_iter(xs.iter().map(|&x| 2.0 * x + 1.0));
//! model.fit(&xs, &y, &FitOptions::default()).unwrap();
//!
//! assert!((model.par("m").unwrap() - 2.0).abs() < 1e-6);
//! assert!((model.par("b").unwrap() - 1.0).abs() < 1e-6);
//! ```

// Public modules
pub mod error;

// Parameter system
pub mod params;

// Numeric engine capabilities
pub mod engine;

// Model framework
pub mod composite;
pub mod coords;
pub mod grid;
pub mod model;
pub mod model1d;
pub mod model2d;
pub mod registry;

// Re-exports for convenience
pub use error::{ModelError, Result};
pub use model::{FitOptions, FunctionModel};
pub use model1d::{FunctionModel1D, Model1D};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
