use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::models::classifier_trait::ClassifierModel;

/// Gradient Boosting Decision Tree (GBDT) classifier
#[derive(Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    learning_rate: f32,
    subsample: f64,
    n_estimators: usize,
    max_depth: u32,
    model: Option<GBDT>,
}

impl std::fmt::Debug for GradientBoostingClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradientBoostingClassifier")
            .field("learning_rate", &self.learning_rate)
            .field("subsample", &self.subsample)
            .field("n_estimators", &self.n_estimators)
            .field("max_depth", &self.max_depth)
            .field("fitted", &self.model.is_some())
            .finish()
    }
}

impl GradientBoostingClassifier {
    pub fn new(learning_rate: f32, subsample: f64, n_estimators: usize, max_depth: u32) -> Self {
        GradientBoostingClassifier {
            learning_rate,
            subsample,
            n_estimators,
            max_depth,
            model: None,
        }
    }
}

fn to_data_vec(x: &Array2<f64>, labels: impl Iterator<Item = f32>) -> DataVec {
    x.rows()
        .into_iter()
        .zip(labels)
        .map(|(row, label)| {
            let features = row.iter().map(|&v| v as f32).collect();
            Data::new_training_data(features, 1.0, label, None)
        })
        .collect()
}

impl ClassifierModel for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(PipelineError::training("gradient boosting got an empty training matrix"));
        }
        if self.n_estimators == 0 {
            return Err(PipelineError::training("gradient boosting needs at least one iteration"));
        }
        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.learning_rate);
        config.set_max_depth(self.max_depth);
        config.set_iterations(self.n_estimators);
        config.set_data_sample_ratio(self.subsample);
        config.set_debug(false);
        config.set_training_optimization_level(2);
        // LogLikelyhood expects labels in {-1, 1}
        config.set_loss("LogLikelyhood");

        let mut train_x = to_data_vec(x, y.iter().map(|&c| if c == 1 { 1.0 } else { -1.0 }));
        let mut gbdt = GBDT::new(&config);
        gbdt.fit(&mut train_x);
        self.model = Some(gbdt);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PipelineError::training("gradient boosting is not fitted"))?;
        let test_x = to_data_vec(x, std::iter::repeat(0.0));
        let probabilities = model.predict(&test_x);
        Ok(probabilities
            .into_iter()
            .map(|p| usize::from(p >= 0.5))
            .collect())
    }

    fn name(&self) -> &str {
        "Gradient Boosting"
    }
}
