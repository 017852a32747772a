//! Integration tests for the model registry, model grids, and 2-D models.

use approx::assert_relative_eq;
use astromod::composite::{BinaryOp, CompositeModel1D};
use astromod::coords::CoordinateTransformer;
use astromod::engine::QuadConfig;
use astromod::grid::{GridInterp, ModelGrid1D};
use astromod::model::FunctionModel;
use astromod::model1d::{FunctionModel1D, Model1D};
use astromod::model2d::{DeformedRadialModel2D, FunctionModel2D, SeparableModel2D};
use astromod::params::ModelSpec;
use astromod::registry::{self, ModelKind, ModelQuery};
use astromod::ModelError;
use ndarray::{array, Array1};

// The registry is process-wide: every test registers under names unique
// to itself.

fn gaussian_factory(nparams: Option<usize>) -> astromod::Result<FunctionModel1D> {
    let spec = ModelSpec::builder("gauss")
        .param("amplitude", 1.0)
        .param("center", 0.0)
        .param("sigma", 1.0)
        .build()?;
    FunctionModel1D::from_spec(&spec, nparams, |x, p| {
        let arg = (x - p[1]) / p[2];
        p[0] * (-0.5 * arg * arg).exp()
    })
}

fn constant_factory(nparams: Option<usize>) -> astromod::Result<FunctionModel1D> {
    let spec = ModelSpec::builder("const").param("c", 1.0).build()?;
    FunctionModel1D::from_spec(&spec, nparams, |_, p| p[0])
}

#[test]
fn registry_round_trip_and_duplicate_detection() {
    registry::register_1d("ItGaussModel", gaussian_factory).unwrap();

    let entry = registry::get_model(ModelQuery::Name("itgauss")).unwrap();
    assert_eq!(entry.name(), "itgauss");
    assert_eq!(entry.kind(), ModelKind::OneD);

    // the un-normalized name resolves too
    let entry = registry::get_model(ModelQuery::Name("ItGaussModel")).unwrap();
    let model = entry.instantiate(None).unwrap().into_one_d().unwrap();
    assert_eq!(model.param_names(), vec!["amplitude", "center", "sigma"]);

    let err = registry::register_1d("itgauss", gaussian_factory).unwrap_err();
    assert!(matches!(err, ModelError::Configuration(_)));
}

#[test]
fn composite_from_registered_names() {
    registry::register_1d("ItCompGauss", gaussian_factory).unwrap();
    registry::register_1d("ItCompConst", constant_factory).unwrap();

    let composite =
        CompositeModel1D::from_names(&["itcompgauss", "itcompconst"], vec![BinaryOp::Add]).unwrap();
    // gaussian peak of 1 on a baseline of 1
    assert_relative_eq!(composite.at(0.0).unwrap(), 2.0, epsilon = 1e-12);

    let err = CompositeModel1D::from_names(&["itcomp_missing"], vec![]).unwrap_err();
    assert!(matches!(err, ModelError::Lookup(_)));
}

#[test]
fn registry_factories_pass_open_arity_counts() {
    registry::register_1d("ItPolyModel", |nparams| {
        let spec = ModelSpec::builder("poly").open_arity("p").build()?;
        FunctionModel1D::from_spec(&spec, nparams, |x, p| {
            p.iter().rev().fold(0.0, |acc, &c| acc * x + c)
        })
    })
    .unwrap();

    let entry = registry::get_model(ModelQuery::Name("itpoly")).unwrap();
    let model = entry.instantiate(Some(4)).unwrap().into_one_d().unwrap();
    assert_eq!(model.param_names(), vec!["p0", "p1", "p2", "p3"]);

    // the count is mandatory for open-arity types
    let err = entry.instantiate(None).unwrap_err();
    assert!(matches!(err, ModelError::Configuration(_)));
}

#[test]
fn grid_inverts_a_scanned_parameter() {
    // gaussians of fixed shape scanned over amplitude
    let models: Vec<FunctionModel1D> = [1.0, 2.0, 3.0, 4.0, 5.0]
        .iter()
        .map(|&a| {
            let mut m = gaussian_factory(None).unwrap();
            m.set_par("amplitude", a).unwrap();
            m
        })
        .collect();
    let mut grid = ModelGrid1D::new(models).unwrap();
    grid.add_extra("logz", vec![-2.0, -1.5, -1.0, -0.5, 0.0]).unwrap();

    // at the peak the output equals the amplitude
    let amp = grid
        .lookup_parameter(&[0.0, 0.0], &array![2.5, 4.0], "amplitude", GridInterp::Linear)
        .unwrap();
    assert_relative_eq!(amp[0], 2.5, epsilon = 1e-12);
    assert_relative_eq!(amp[1], 4.0, epsilon = 1e-12);

    // the extra array interpolates on the same bracket
    let logz = grid
        .lookup_parameter(&[0.0], &array![2.5], "logz", GridInterp::Linear)
        .unwrap();
    assert_relative_eq!(logz[0], -1.25, epsilon = 1e-12);

    let err = grid
        .lookup_parameter(&[0.0], &array![2.5], "logz", GridInterp::Spline)
        .unwrap_err();
    assert!(matches!(err, ModelError::NotImplemented(_)));
}

#[test]
fn two_d_model_with_coordinate_transform() {
    // an exponential disk defined on the radius, observed in cartesian x/y
    let spec = ModelSpec::builder("expdisk")
        .param("norm", 2.0)
        .param("scale", 1.0)
        .build()
        .unwrap();
    let model = FunctionModel2D::from_spec(&spec, None, |r, _theta, p| p[0] * (-r / p[1]).exp())
        .unwrap()
        .with_transformer(CoordinateTransformer::new("cartesian", "polar"));

    let out = model.eval(&array![[3.0, 0.0], [4.0, 1.0]]).unwrap();
    assert_relative_eq!(out[0], 2.0 * (-5.0_f64).exp(), epsilon = 1e-12);
    assert_relative_eq!(out[1], 2.0 * (-1.0_f64).exp(), epsilon = 1e-12);

    // the generic fit machinery runs on 2-D points
    use astromod::model::FitOptions;
    let points: Vec<[f64; 2]> = (0..25)
        .map(|i| [0.2 * (i % 5) as f64, 0.2 * (i / 5) as f64])
        .collect();
    let y = Array1::from_iter(points.iter().map(|p| {
        let r = p[0].hypot(p[1]);
        3.0 * (-r / 0.8).exp()
    }));
    let mut fitme = FunctionModel2D::from_spec(&spec, None, |r, _theta, p| p[0] * (-r / p[1]).exp())
        .unwrap()
        .with_transformer(CoordinateTransformer::new("cartesian", "polar"));
    fitme.fit(&points, &y, &FitOptions::default()).unwrap();
    assert_relative_eq!(fitme.par("norm").unwrap(), 3.0, epsilon = 1e-5);
    assert_relative_eq!(fitme.par("scale").unwrap(), 0.8, epsilon = 1e-5);
}

#[test]
fn radial_combinators_build_from_registered_profiles() {
    registry::register_1d("ItExpProfModel", |nparams| {
        let spec = ModelSpec::builder("expprof").param("scale", 1.0).build()?;
        FunctionModel1D::from_spec(&spec, nparams, |r, p| (-r / p[0]).exp())
    })
    .unwrap();

    // a separable model with no angular factor is the bare radial profile
    let model = SeparableModel2D::from_names(Some("itexpprof"), None).unwrap();
    let out = model.eval(&array![[3.0], [4.0]]).unwrap();
    assert_relative_eq!(out[0], (-5.0_f64).exp(), epsilon = 1e-12);

    // the deformed wrapper appends its shape parameters and fits them
    let mut model = DeformedRadialModel2D::from_name("itexpprof", 1.0, 0.0).unwrap();
    assert_eq!(model.param_names(), vec!["scale", "atob", "pa"]);

    let points: Vec<[f64; 2]> = (0..30)
        .map(|i| [0.3 * (i % 6) as f64 - 0.75, 0.3 * (i / 6) as f64 - 0.6])
        .collect();
    let y = Array1::from_iter(points.iter().map(|p| {
        let r = p[1].hypot(p[0] / 2.0);
        (-r / 1.0).exp()
    }));
    use astromod::model::FitOptions;
    let opts = FitOptions::default().fixed(&["scale", "pa"]);
    model.fit(&points, &y, &opts).unwrap();
    assert_relative_eq!(model.axis_ratio(), 2.0, epsilon = 1e-5);
}

#[test]
fn two_d_integration_and_pixelization() {
    let spec = ModelSpec::builder("flat").param("c", 2.0).build().unwrap();
    let mut model = FunctionModel2D::from_spec(&spec, None, |_x, _y, p| p[0]).unwrap();

    let v = model
        .integrate_cartesian(0.0, 2.0, 0.0, 3.0, &QuadConfig::default())
        .unwrap();
    assert_relative_eq!(v, 12.0, epsilon = 1e-8);

    let img = model.pixelize(0.0, 1.0, 0.0, 1.0, 5, 5, Some(1)).unwrap();
    assert_eq!(img.dim(), (5, 5));
    let total: f64 = img.iter().sum();
    assert_relative_eq!(total, 2.0, epsilon = 1e-8);
}
