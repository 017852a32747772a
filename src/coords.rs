//! Coordinate-system transforms for 2-D models.
//!
//! A [`CoordinateTransformer`] is a by-value capability composed into
//! models whose evaluation function is defined in a particular coordinate
//! system. It maps points between named systems through a per-instance
//! transform table seeded with the cartesian/polar pair.

use crate::error::{ModelError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// A pointwise transform between two named coordinate systems.
pub type PointTransform = Arc<dyn Fn([f64; 2]) -> [f64; 2] + Send + Sync>;

/// Convert `[x, y]` to `[r, theta]`.
pub fn cartesian_to_polar(p: [f64; 2]) -> [f64; 2] {
    let [x, y] = p;
    [x.hypot(y), y.atan2(x)]
}

/// Convert `[r, theta]` to `[x, y]`.
pub fn polar_to_cartesian(p: [f64; 2]) -> [f64; 2] {
    let [r, theta] = p;
    [r * theta.cos(), r * theta.sin()]
}

/// Maps input points between named coordinate systems.
///
/// The transformer tracks the system inputs arrive in and the system the
/// owning model's function is defined in; `transform` with no explicit
/// systems maps between those two. Identical systems are an identity map,
/// and unregistered pairs are lookup errors.
#[derive(Clone)]
pub struct CoordinateTransformer {
    input_system: String,
    func_system: String,
    table: HashMap<(String, String), PointTransform>,
}

impl CoordinateTransformer {
    /// A transformer between the given input and function systems, with
    /// the cartesian/polar pair pre-registered.
    pub fn new(input_system: &str, func_system: &str) -> Self {
        let mut table: HashMap<(String, String), PointTransform> = HashMap::new();
        table.insert(
            ("cartesian".to_string(), "polar".to_string()),
            Arc::new(cartesian_to_polar),
        );
        table.insert(
            ("polar".to_string(), "cartesian".to_string()),
            Arc::new(polar_to_cartesian),
        );
        Self {
            input_system: input_system.to_string(),
            func_system: func_system.to_string(),
            table,
        }
    }

    /// A transformer with both systems cartesian.
    pub fn cartesian() -> Self {
        Self::new("cartesian", "cartesian")
    }

    /// The system input points currently arrive in.
    pub fn input_system(&self) -> &str {
        &self.input_system
    }

    /// Change the system input points arrive in.
    pub fn set_input_system(&mut self, system: &str) {
        self.input_system = system.to_string();
    }

    /// The system the model function is defined in.
    pub fn func_system(&self) -> &str {
        &self.func_system
    }

    /// Register a transform between two named systems on this instance.
    pub fn add_transform<F>(&mut self, from: &str, to: &str, func: F)
    where
        F: Fn([f64; 2]) -> [f64; 2] + Send + Sync + 'static,
    {
        self.table
            .insert((from.to_string(), to.to_string()), Arc::new(func));
    }

    /// Transform a point between systems.
    ///
    /// `from` defaults to the input system and `to` to the function
    /// system. Identical systems return the point unchanged; otherwise the
    /// registered transform for the pair applies, and a missing pair is a
    /// lookup error.
    pub fn transform(&self, p: [f64; 2], from: Option<&str>, to: Option<&str>) -> Result<[f64; 2]> {
        let from = from.unwrap_or(&self.input_system);
        let to = to.unwrap_or(&self.func_system);
        if from == to {
            return Ok(p);
        }
        match self.table.get(&(from.to_string(), to.to_string())) {
            Some(func) => Ok(func(p)),
            None => Err(ModelError::Lookup(format!(
                "no transform registered from '{}' to '{}'",
                from, to
            ))),
        }
    }
}

impl std::fmt::Debug for CoordinateTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateTransformer")
            .field("input_system", &self.input_system)
            .field("func_system", &self.func_system)
            .field("pairs", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_when_systems_match() {
        let t = CoordinateTransformer::cartesian();
        assert_eq!(t.transform([1.0, 2.0], None, None).unwrap(), [1.0, 2.0]);
    }

    #[test]
    fn test_cartesian_polar_round_trip() {
        let t = CoordinateTransformer::new("cartesian", "polar");
        let [r, theta] = t.transform([0.0, 2.0], None, None).unwrap();
        assert_relative_eq!(r, 2.0);
        assert_relative_eq!(theta, FRAC_PI_2);

        let [x, y] = t.transform([r, theta], Some("polar"), Some("cartesian")).unwrap();
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, 2.0);
    }

    #[test]
    fn test_unregistered_pair_fails() {
        let t = CoordinateTransformer::cartesian();
        let err = t.transform([1.0, 1.0], Some("galactic"), Some("polar")).unwrap_err();
        assert!(matches!(err, ModelError::Lookup(_)));
    }

    #[test]
    fn test_per_instance_transform_registration() {
        let mut t = CoordinateTransformer::new("sky", "cartesian");
        t.add_transform("sky", "cartesian", |p| [p[0] * 2.0, p[1] * 2.0]);
        assert_eq!(t.transform([1.0, 3.0], None, None).unwrap(), [2.0, 6.0]);

        // a fresh instance does not see the addition
        let fresh = CoordinateTransformer::new("sky", "cartesian");
        assert!(fresh.transform([1.0, 3.0], None, None).is_err());
    }
}
