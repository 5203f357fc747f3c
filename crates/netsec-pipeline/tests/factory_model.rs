use std::str::FromStr;

use ndarray::{Array1, Array2};
use netsec_pipeline::config::ModelType;
use netsec_pipeline::models::classifier_trait::ClassifierModel;
use netsec_pipeline::models::factory::{self, Classifier};

fn toy_data() -> (Array2<f64>, Array1<usize>) {
    // two well separated blobs, alternating classes
    let x = Array2::from_shape_fn((40, 2), |(r, c)| {
        let base = if r % 2 == 0 { 1.0 } else { -1.0 };
        let jitter = ((r * 7 + c * 3) % 5) as f64 * 0.05;
        if c == 0 {
            base + jitter
        } else {
            -base - jitter
        }
    });
    let y = Array1::from_shape_fn(40, |r| if r % 2 == 0 { 1 } else { 0 });
    (x, y)
}

#[test]
fn test_factory_builds_and_predicts_every_family() {
    let (x, y) = toy_data();
    for name in [
        "random_forest",
        "decision_tree",
        "gradient_boosting",
        "logistic_regression",
        "adaboost",
    ] {
        let model_type = ModelType::from_str(name).unwrap();
        let mut model = factory::build_model(&model_type, Some(42));
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        assert_eq!(pred.len(), x.nrows(), "{name}");
        let correct = pred.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        assert!(correct >= 36, "{name} got {correct}/40 on separable data");
    }
}

#[test]
fn test_fitted_model_survives_serialisation() {
    let (x, y) = toy_data();
    let model_type = ModelType::RandomForest {
        n_estimators: 8,
        max_depth: Some(3),
    };
    let mut model = factory::build_model(&model_type, Some(7));
    model.fit(&x, &y).unwrap();

    let bytes = bincode::serialize(&model).unwrap();
    let restored: Classifier = bincode::deserialize(&bytes).unwrap();
    assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
}

#[test]
fn test_same_seed_gives_same_forest() {
    let (x, y) = toy_data();
    let model_type = ModelType::RandomForest {
        n_estimators: 16,
        max_depth: None,
    };
    let mut a = factory::build_model(&model_type, Some(3));
    let mut b = factory::build_model(&model_type, Some(3));
    a.fit(&x, &y).unwrap();
    b.fit(&x, &y).unwrap();
    assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
}
