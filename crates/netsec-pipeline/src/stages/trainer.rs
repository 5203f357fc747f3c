use ndarray::{s, Array1, Array2};

use crate::artifact::{ClassificationMetricArtifact, DataTransformationArtifact, ModelTrainerArtifact};
use crate::config::SearchSpace;
use crate::data_handling::labels_to_classes;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::io::npy::load_array;
use crate::io::object::{load_object, save_object, to_bytes};
use crate::layout::ModelTrainerConfig;
use crate::metrics::classification_score;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::estimator::NetworkModel;
use crate::models::search::{evaluate_models, select_best};
use crate::preprocessing::Preprocessor;
use crate::tracking::{track_model, ExperimentTracker};

/// Split a transformed matrix into features and class labels (last column).
pub fn split_features_labels(arr: &Array2<f64>) -> Result<(Array2<f64>, Array1<usize>)> {
    if arr.ncols() < 2 {
        return Err(PipelineError::data_format(format!(
            "expected at least one feature column and a label column, got {} columns",
            arr.ncols()
        )));
    }
    let last = arr.ncols() - 1;
    let x = arr.slice(s![.., ..last]).to_owned();
    let y = labels_to_classes(arr.column(last))?;
    Ok((x, y))
}

pub struct ModelTrainer<'a> {
    transformation_artifact: DataTransformationArtifact,
    config: ModelTrainerConfig,
    search_spaces: Vec<SearchSpace>,
    tracker: &'a mut dyn ExperimentTracker,
}

impl<'a> ModelTrainer<'a> {
    pub fn new(
        transformation_artifact: DataTransformationArtifact,
        config: ModelTrainerConfig,
        search_spaces: Vec<SearchSpace>,
        tracker: &'a mut dyn ExperimentTracker,
    ) -> Self {
        Self {
            transformation_artifact,
            config,
            search_spaces,
            tracker,
        }
    }

    fn check_fit(&self, train: &ClassificationMetricArtifact, test: &ClassificationMetricArtifact) {
        let gap = (train.f1_score - test.f1_score).abs();
        if gap > self.config.overfitting_threshold {
            log::warn!(
                "Train/test f1 gap {:.4} exceeds {:.4}: the model may be over- or underfitting",
                gap,
                self.config.overfitting_threshold
            );
        }
    }

    pub fn train_model(
        &mut self,
        x_train: &Array2<f64>,
        y_train: &Array1<usize>,
        x_test: &Array2<f64>,
        y_test: &Array1<usize>,
    ) -> Result<ModelTrainerArtifact> {
        let report = evaluate_models(
            x_train,
            y_train,
            x_test,
            y_test,
            &self.search_spaces,
            self.config.cv_folds,
            self.config.model_seed,
        )?;
        let best_idx = select_best(report.iter().map(|e| e.test_score))
            .ok_or_else(|| PipelineError::training("model report has no finite score"))?;
        let best = report
            .into_iter()
            .nth(best_idx)
            .ok_or_else(|| PipelineError::training("model report index out of range"))?;
        log::info!(
            "Best model: {} with test accuracy {:.4}",
            best.family,
            best.test_score
        );

        if let Some(expected) = self.config.expected_score {
            if best.test_score < expected {
                return Err(PipelineError::new(
                    ErrorKind::ModelRejected,
                    format!(
                        "best model {} scored {:.4}, below the expected {:.4}",
                        best.family, best.test_score, expected
                    ),
                ));
            }
        }

        let model = best.model;
        let train_metric = classification_score(y_train.view(), model.predict(x_train)?.view());
        let test_metric = classification_score(y_test.view(), model.predict(x_test)?.view());
        log::info!("Train metrics: {:?}", train_metric);
        log::info!("Test metrics: {:?}", test_metric);
        self.check_fit(&train_metric, &test_metric);

        let model_bytes = to_bytes(&model)?;
        track_model(&mut *self.tracker, "train", &train_metric, &model_bytes)?;
        track_model(&mut *self.tracker, "test", &test_metric, &model_bytes)?;

        let preprocessor: Preprocessor =
            load_object(&self.transformation_artifact.transformed_object_file_path)?;
        save_object(&model, &self.config.final_model_file_path)?;
        let network_model = NetworkModel::new(preprocessor, model);
        save_object(&network_model, &self.config.trained_model_file_path)?;

        let artifact = ModelTrainerArtifact {
            trained_model_file_path: self.config.trained_model_file_path.clone(),
            train_metric_artifact: train_metric,
            test_metric_artifact: test_metric,
        };
        log::info!("Model trainer artifact: {:?}", artifact);
        Ok(artifact)
    }

    pub fn initiate_model_trainer(&mut self) -> Result<ModelTrainerArtifact> {
        let train_arr = load_array(&self.transformation_artifact.transformed_train_file_path)?;
        let test_arr = load_array(&self.transformation_artifact.transformed_test_file_path)?;
        let (x_train, y_train) = split_features_labels(&train_arr)?;
        let (x_test, y_test) = split_features_labels(&test_arr)?;
        if x_train.ncols() != x_test.ncols() {
            return Err(PipelineError::data_format(format!(
                "train has {} features, test has {}",
                x_train.ncols(),
                x_test.ncols()
            )));
        }
        self.train_model(&x_train, &y_train, &x_test, &y_test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn labels_come_from_the_last_column() {
        let arr = array![[0.5, 1.5, 1.0], [2.0, 3.0, 0.0]];
        let (x, y) = split_features_labels(&arr).unwrap();
        assert_eq!(x, array![[0.5, 1.5], [2.0, 3.0]]);
        assert_eq!(y, array![1usize, 0]);
    }

    #[test]
    fn non_binary_labels_are_rejected() {
        let arr = array![[0.5, -1.0]];
        let err = split_features_labels(&arr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
        assert!(split_features_labels(&array![[1.0]]).is_err());
    }
}
