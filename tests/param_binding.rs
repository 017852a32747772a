//! Integration tests for the parameter schema and binding system.

use astromod::model::FunctionModel;
use astromod::model1d::FunctionModel1D;
use astromod::params::{ModelSpec, ParamSet, DEFAULT_PARVAL};
use astromod::ModelError;
use std::collections::HashMap;

/// The schema of f(x, a=2, b=3).
fn two_param_spec() -> ModelSpec {
    ModelSpec::builder("twoparams")
        .param("a", 2.0)
        .param("b", 3.0)
        .build()
        .unwrap()
}

#[test]
fn declared_defaults_become_parameter_values() {
    let model = FunctionModel1D::from_spec(&two_param_spec(), None, |x, p| p[0] * x + p[1]).unwrap();
    assert_eq!(model.param_names(), vec!["a", "b"]);
    assert_eq!(model.par_values(), vec![2.0, 3.0]);
}

#[test]
fn names_and_values_stay_parallel() {
    let mut model =
        FunctionModel1D::from_spec(&two_param_spec(), None, |x, p| p[0] * x + p[1]).unwrap();
    assert_eq!(model.param_names().len(), model.par_values().len());

    model.set_par_values(&[10.0]).unwrap();
    assert_eq!(model.param_names().len(), model.par_values().len());
    assert_eq!(model.par_values(), vec![10.0, 3.0]);

    // oversupplying values fails and changes nothing
    let err = model.set_par_values(&[1.0, 2.0, 3.0]).unwrap_err();
    assert!(matches!(err, ModelError::Configuration(_)));
    assert_eq!(model.par_values(), vec![10.0, 3.0]);
}

#[test]
fn pardict_round_trips() {
    let mut model =
        FunctionModel1D::from_spec(&two_param_spec(), None, |x, p| p[0] * x + p[1]).unwrap();

    let mut d = HashMap::new();
    d.insert("a".to_string(), 7.0);
    d.insert("b".to_string(), -1.0);
    model.set_pardict(&d).unwrap();
    assert_eq!(model.pardict(), d);

    let mut bad = HashMap::new();
    bad.insert("c".to_string(), 0.0);
    assert!(matches!(
        model.set_pardict(&bad).unwrap_err(),
        ModelError::Lookup(_)
    ));
    // the failed assignment left the values alone
    assert_eq!(model.pardict(), d);
}

#[test]
fn open_arity_generates_requested_count() {
    let spec = ModelSpec::builder("poly").open_arity("p").build().unwrap();

    let model = FunctionModel1D::from_spec(&spec, Some(3), |x, p| {
        p.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    })
    .unwrap();

    assert_eq!(model.param_names(), vec!["p0", "p1", "p2"]);
    assert_eq!(model.par_values(), vec![DEFAULT_PARVAL; 3]);
}

#[test]
fn open_arity_without_count_fails_construction() {
    let spec = ModelSpec::builder("poly").open_arity("p").build().unwrap();
    let err = FunctionModel1D::from_spec(&spec, None, |_, _| 0.0).unwrap_err();
    assert!(matches!(err, ModelError::Configuration(_)));
}

#[test]
fn open_arity_respects_declared_defaults_and_prefix() {
    let spec = ModelSpec::builder("scaledpoly")
        .param("scale", 10.0)
        .open_arity("c")
        .open_default("c0", 0.5)
        .build()
        .unwrap();
    assert_eq!(spec.static_names(), vec!["scale"]);

    let params = spec.materialize(Some(2)).unwrap();
    assert_eq!(params.names(), vec!["scale", "c0", "c1"]);
    assert_eq!(params.values(), vec![10.0, 0.5, 1.0]);
}

#[test]
fn instantiate_separates_initial_values_from_unknown_names() {
    let spec = two_param_spec();

    let params = spec.instantiate(None, &[9.0], &[("b", 4.0)]).unwrap();
    assert_eq!(params.value_of("a").unwrap(), 9.0);
    assert_eq!(params.value_of("b").unwrap(), 4.0);

    let err = spec.instantiate(None, &[1.0, 2.0, 3.0], &[]).unwrap_err();
    assert!(matches!(err, ModelError::Configuration(_)));
}

#[test]
fn param_set_json_round_trip() {
    let mut params = ParamSet::new();
    params.add_param("amplitude", 2.0).unwrap();
    params.add_param("center", 0.0).unwrap();
    params.set_value_of("center", 1.5).unwrap();

    let json = params.to_json().unwrap();
    let restored = ParamSet::from_json(&json).unwrap();
    assert_eq!(restored.names(), params.names());
    assert_eq!(restored.values(), params.values());
}
