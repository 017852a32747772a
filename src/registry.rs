//! Process-wide model type registry.
//!
//! Model types register under a normalized name (lower-cased, with the
//! substring `model` stripped) together with a factory closure producing
//! fresh instances. The registry starts empty and is only mutated by
//! explicit registration calls; duplicate names fail unless overwriting is
//! requested. Lookup accepts a name, a live model instance, or an entry,
//! optionally checked against a required model kind.
//!
//! The table lives behind an `RwLock`; concurrent registration is not part
//! of the design contract and must be serialized by the caller.

use crate::error::{ModelError, Result};
use crate::model1d::FunctionModel1D;
use crate::model2d::FunctionModel2D;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// The kind of model an entry produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    OneD,
    TwoD,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::OneD => write!(f, "1-D"),
            ModelKind::TwoD => write!(f, "2-D"),
        }
    }
}

type Factory1D = Arc<dyn Fn(Option<usize>) -> Result<FunctionModel1D> + Send + Sync>;
type Factory2D = Arc<dyn Fn(Option<usize>) -> Result<FunctionModel2D> + Send + Sync>;

#[derive(Clone)]
enum Factory {
    OneD(Factory1D),
    TwoD(Factory2D),
}

/// A fresh model produced by a registry entry.
#[derive(Debug, Clone)]
pub enum ModelInstance {
    OneD(FunctionModel1D),
    TwoD(FunctionModel2D),
}

impl ModelInstance {
    /// Unwrap a 1-D model; fails with a type mismatch for 2-D entries.
    pub fn into_one_d(self) -> Result<FunctionModel1D> {
        match self {
            ModelInstance::OneD(m) => Ok(m),
            ModelInstance::TwoD(m) => Err(ModelError::TypeMismatch(format!(
                "model '{}' is 2-D, not 1-D",
                m.type_name()
            ))),
        }
    }

    /// Unwrap a 2-D model; fails with a type mismatch for 1-D entries.
    pub fn into_two_d(self) -> Result<FunctionModel2D> {
        match self {
            ModelInstance::TwoD(m) => Ok(m),
            ModelInstance::OneD(m) => Err(ModelError::TypeMismatch(format!(
                "model '{}' is 1-D, not 2-D",
                m.type_name()
            ))),
        }
    }
}

/// A registered model type: its normalized name, kind, and factory.
#[derive(Clone)]
pub struct ModelEntry {
    name: String,
    factory: Factory,
}

impl ModelEntry {
    /// The normalized registry name of this entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of model this entry produces.
    pub fn kind(&self) -> ModelKind {
        match self.factory {
            Factory::OneD(_) => ModelKind::OneD,
            Factory::TwoD(_) => ModelKind::TwoD,
        }
    }

    /// Produce a fresh instance, passing the open-arity parameter count
    /// through to the factory.
    pub fn instantiate(&self, nparams: Option<usize>) -> Result<ModelInstance> {
        match &self.factory {
            Factory::OneD(f) => Ok(ModelInstance::OneD(f(nparams)?)),
            Factory::TwoD(f) => Ok(ModelInstance::TwoD(f(nparams)?)),
        }
    }
}

impl std::fmt::Debug for ModelEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEntry")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// The forms a registry lookup accepts: a name, a live instance, or an
/// entry handed out earlier.
#[derive(Clone)]
pub enum ModelQuery<'a> {
    Name(&'a str),
    OneD(&'a FunctionModel1D),
    TwoD(&'a FunctionModel2D),
    Entry(&'a ModelEntry),
}

fn table() -> &'static RwLock<HashMap<String, ModelEntry>> {
    static TABLE: OnceLock<RwLock<HashMap<String, ModelEntry>>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Normalize a registry name: lower-cased, with the substring `model`
/// stripped.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace("model", "")
}

fn insert(name: &str, factory: Factory, overwrite: bool) -> Result<()> {
    let normalized = normalize_name(name);
    if normalized.is_empty() {
        return Err(ModelError::Configuration(format!(
            "registry name '{}' normalizes to an empty string",
            name
        )));
    }

    let mut map = table().write().expect("registry lock poisoned");
    if map.contains_key(&normalized) && !overwrite {
        return Err(ModelError::Configuration(format!(
            "model '{}' is already registered; pass overwrite to replace it",
            normalized
        )));
    }
    map.insert(
        normalized.clone(),
        ModelEntry {
            name: normalized,
            factory,
        },
    );
    Ok(())
}

/// Register a 1-D model factory under the given name.
///
/// Fails with a configuration error if the normalized name is already
/// registered.
pub fn register_1d<F>(name: &str, factory: F) -> Result<()>
where
    F: Fn(Option<usize>) -> Result<FunctionModel1D> + Send + Sync + 'static,
{
    insert(name, Factory::OneD(Arc::new(factory)), false)
}

/// Register a 2-D model factory under the given name.
pub fn register_2d<F>(name: &str, factory: F) -> Result<()>
where
    F: Fn(Option<usize>) -> Result<FunctionModel2D> + Send + Sync + 'static,
{
    insert(name, Factory::TwoD(Arc::new(factory)), false)
}

/// Register a 1-D model factory, replacing any existing entry.
pub fn register_1d_overwrite<F>(name: &str, factory: F) -> Result<()>
where
    F: Fn(Option<usize>) -> Result<FunctionModel1D> + Send + Sync + 'static,
{
    insert(name, Factory::OneD(Arc::new(factory)), true)
}

/// Register a 2-D model factory, replacing any existing entry.
pub fn register_2d_overwrite<F>(name: &str, factory: F) -> Result<()>
where
    F: Fn(Option<usize>) -> Result<FunctionModel2D> + Send + Sync + 'static,
{
    insert(name, Factory::TwoD(Arc::new(factory)), true)
}

/// Whether the normalized name is registered.
pub fn is_registered(name: &str) -> bool {
    table()
        .read()
        .expect("registry lock poisoned")
        .contains_key(&normalize_name(name))
}

/// Resolve a query to its registry entry.
///
/// Instance queries resolve through the instance's type name; unknown
/// names are lookup errors.
pub fn get_model(query: ModelQuery<'_>) -> Result<ModelEntry> {
    let name = match query {
        ModelQuery::Name(name) => normalize_name(name),
        ModelQuery::OneD(m) => normalize_name(m.type_name()),
        ModelQuery::TwoD(m) => normalize_name(m.type_name()),
        ModelQuery::Entry(entry) => return Ok(entry.clone()),
    };
    table()
        .read()
        .expect("registry lock poisoned")
        .get(&name)
        .cloned()
        .ok_or_else(|| ModelError::Lookup(format!("no model registered under '{}'", name)))
}

/// Resolve a query and check the entry against a required model kind.
pub fn get_model_of_kind(query: ModelQuery<'_>, kind: ModelKind) -> Result<ModelEntry> {
    let entry = get_model(query)?;
    if entry.kind() != kind {
        return Err(ModelError::TypeMismatch(format!(
            "model '{}' is {}, not {}",
            entry.name(),
            entry.kind(),
            kind
        )));
    }
    Ok(entry)
}

/// List registered model names, sorted.
///
/// `include` restricts the listing to the named entries and `exclude`
/// removes the named entries from it; giving both is a configuration
/// error, and naming an unregistered entry in either is a lookup error.
/// `kind` filters by model kind after the include/exclude selection.
pub fn list_models(
    include: Option<&[&str]>,
    exclude: Option<&[&str]>,
    kind: Option<ModelKind>,
) -> Result<Vec<String>> {
    if include.is_some() && exclude.is_some() {
        return Err(ModelError::Configuration(
            "cannot give both include and exclude lists".to_string(),
        ));
    }

    let map = table().read().expect("registry lock poisoned");
    for name in include.into_iter().chain(exclude).flatten() {
        if !map.contains_key(&normalize_name(name)) {
            return Err(ModelError::Lookup(format!(
                "no model registered under '{}'",
                normalize_name(name)
            )));
        }
    }

    let mut names: Vec<String> = map
        .values()
        .filter(|e| kind.map_or(true, |k| e.kind() == k))
        .filter(|e| match include {
            Some(inc) => inc.iter().any(|n| normalize_name(n) == e.name),
            None => true,
        })
        .filter(|e| match exclude {
            Some(exc) => !exc.iter().any(|n| normalize_name(n) == e.name),
            None => true,
        })
        .map(|e| e.name.clone())
        .collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FunctionModel;
    use crate::params::ModelSpec;

    // The registry is process-wide state shared between tests: every test
    // uses names unique to itself.

    fn register_line(name: &str) {
        register_1d_overwrite(name, |n| {
            let spec = ModelSpec::builder("line")
                .param("m", 1.0)
                .param("b", 0.0)
                .build()?;
            FunctionModel1D::from_spec(&spec, n, |x, p| p[0] * x + p[1])
        })
        .unwrap();
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("GaussModel"), "gauss");
        assert_eq!(normalize_name("powerlaw"), "powerlaw");
    }

    #[test]
    fn test_register_and_lookup_round_trip() {
        register_line("RegRoundTripModel");
        let entry = get_model(ModelQuery::Name("regroundtrip")).unwrap();
        assert_eq!(entry.name(), "regroundtrip");
        assert_eq!(entry.kind(), ModelKind::OneD);

        let model = entry.instantiate(None).unwrap().into_one_d().unwrap();
        assert_eq!(model.param_names(), vec!["m", "b"]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        register_line("RegDupModel");
        let err = register_1d("regdup", |_| unreachable!()).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));

        // explicit overwrite succeeds
        register_line("RegDupModel");
    }

    #[test]
    fn test_lookup_by_instance() {
        register_line("RegByInstance");
        let model = get_model(ModelQuery::Name("regbyinstance"))
            .unwrap()
            .instantiate(None)
            .unwrap()
            .into_one_d()
            .unwrap();
        // type_name is "line", so register it too
        register_line("line");
        let entry = get_model(ModelQuery::OneD(&model)).unwrap();
        assert_eq!(entry.name(), "line");
    }

    #[test]
    fn test_kind_check() {
        register_line("RegKindCheck");
        let err = get_model_of_kind(ModelQuery::Name("regkindcheck"), ModelKind::TwoD).unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch(_)));

        let entry = get_model(ModelQuery::Name("regkindcheck")).unwrap();
        let err = entry.instantiate(None).unwrap().into_two_d().unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch(_)));
    }

    #[test]
    fn test_unknown_name_fails() {
        let err = get_model(ModelQuery::Name("never_registered")).unwrap_err();
        assert!(matches!(err, ModelError::Lookup(_)));
    }

    #[test]
    fn test_listing() {
        register_line("RegListAModel");
        register_line("RegListBModel");

        let names = list_models(Some(&["reglista", "reglistb"]), None, None).unwrap();
        assert_eq!(names, vec!["reglista", "reglistb"]);

        let err = list_models(Some(&["reglista"]), Some(&["reglistb"]), None).unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));

        let err = list_models(Some(&["reglist_missing"]), None, None).unwrap_err();
        assert!(matches!(err, ModelError::Lookup(_)));

        let all = list_models(None, None, Some(ModelKind::OneD)).unwrap();
        assert!(all.contains(&"reglista".to_string()));
    }
}
