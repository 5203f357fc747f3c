use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::data_handling::Table;
use crate::error::Result;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::factory::Classifier;
use crate::preprocessing::Preprocessor;

/// Inference wrapper: the fitted preprocessor and the selected model, so
/// features are always handled the way they were at training time.
#[derive(Debug, Serialize, Deserialize)]
pub struct NetworkModel {
    preprocessor: Preprocessor,
    model: Classifier,
}

impl NetworkModel {
    pub fn new(preprocessor: Preprocessor, model: Classifier) -> Self {
        Self {
            preprocessor,
            model,
        }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &Classifier {
        &self.model
    }

    /// Predict from a raw feature matrix in training column order.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let transformed = self.preprocessor.transform(x)?;
        self.model.predict(&transformed)
    }

    /// Predict from a table, selecting the training feature columns by name.
    pub fn predict_table(&self, table: &Table) -> Result<Array1<usize>> {
        let transformed = self.preprocessor.transform_table(table)?;
        log::debug!(
            "Predicting {} rows with {}",
            transformed.nrows(),
            self.model.name()
        );
        self.model.predict(&transformed)
    }
}
