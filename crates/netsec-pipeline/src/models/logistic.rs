use linfa::prelude::*;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::models::classifier_trait::ClassifierModel;

/// L2-regularised binary logistic regression backed by `linfa-logistic`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogisticRegressionClassifier {
    alpha: f64,
    max_iterations: u64,
    model: Option<FittedLogisticRegression<f64, usize>>,
}

impl LogisticRegressionClassifier {
    pub fn new(alpha: f64, max_iterations: u64) -> Self {
        Self {
            alpha,
            max_iterations,
            model: None,
        }
    }
}

impl ClassifierModel for LogisticRegressionClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        let dataset = Dataset::new(x.clone(), y.clone());
        let model = LogisticRegression::default()
            .alpha(self.alpha)
            .max_iterations(self.max_iterations)
            .fit(&dataset)
            .or_kind(ErrorKind::Training, || {
                "Failed to fit logistic regression".to_string()
            })?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PipelineError::training("logistic regression is not fitted"))?;
        Ok(model.predict(x))
    }

    fn name(&self) -> &str {
        "Logistic Regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn separates_linear_classes() {
        let x = array![[-2.0, -1.0], [-1.5, -2.0], [-1.0, -1.0], [1.0, 1.5], [2.0, 1.0], [1.5, 2.0]];
        let y = array![0usize, 0, 0, 1, 1, 1];
        let mut model = LogisticRegressionClassifier::new(0.1, 200);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn single_class_is_a_training_error() {
        let x = array![[1.0], [2.0]];
        let y = array![1usize, 1];
        let mut model = LogisticRegressionClassifier::new(1.0, 100);
        let err = model.fit(&x, &y).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Training);
    }
}
