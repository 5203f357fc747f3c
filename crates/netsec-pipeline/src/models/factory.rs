use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::ModelType;
use crate::error::Result;
use crate::models::adaboost::AdaBoostClassifier;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::decision_tree::DecisionTreeClassifier;
use crate::models::gbdt::GradientBoostingClassifier;
use crate::models::logistic::LogisticRegressionClassifier;
use crate::models::random_forest::RandomForestClassifier;

/// Any candidate classifier. A closed enum rather than a trait object so the
/// fitted model can be serialised as a whole.
#[derive(Debug, Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(RandomForestClassifier),
    DecisionTree(DecisionTreeClassifier),
    GradientBoosting(GradientBoostingClassifier),
    LogisticRegression(LogisticRegressionClassifier),
    AdaBoost(AdaBoostClassifier),
}

impl Classifier {
    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            Classifier::RandomForest(m) => m,
            Classifier::DecisionTree(m) => m,
            Classifier::GradientBoosting(m) => m,
            Classifier::LogisticRegression(m) => m,
            Classifier::AdaBoost(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            Classifier::RandomForest(m) => m,
            Classifier::DecisionTree(m) => m,
            Classifier::GradientBoosting(m) => m,
            Classifier::LogisticRegression(m) => m,
            Classifier::AdaBoost(m) => m,
        }
    }
}

impl ClassifierModel for Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        self.inner().predict(x)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

/// Build an unfitted classifier for one concrete configuration. `seed` drives
/// the resampling of the ensemble families.
pub fn build_model(model_type: &ModelType, seed: Option<u64>) -> Classifier {
    match *model_type {
        ModelType::RandomForest {
            n_estimators,
            max_depth,
        } => Classifier::RandomForest(RandomForestClassifier::new(n_estimators, max_depth, seed)),
        ModelType::DecisionTree {
            criterion,
            max_depth,
        } => Classifier::DecisionTree(DecisionTreeClassifier::new(criterion, max_depth)),
        ModelType::GradientBoosting {
            learning_rate,
            subsample,
            n_estimators,
            max_depth,
        } => Classifier::GradientBoosting(GradientBoostingClassifier::new(
            learning_rate,
            subsample,
            n_estimators,
            max_depth,
        )),
        ModelType::LogisticRegression {
            alpha,
            max_iterations,
        } => Classifier::LogisticRegression(LogisticRegressionClassifier::new(alpha, max_iterations)),
        ModelType::AdaBoost {
            learning_rate,
            n_estimators,
        } => Classifier::AdaBoost(AdaBoostClassifier::new(learning_rate, n_estimators, seed)),
    }
}
