use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::SplitCriterion;
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::models::classifier_trait::ClassifierModel;

pub(crate) fn split_quality(criterion: SplitCriterion) -> SplitQuality {
    match criterion {
        SplitCriterion::Gini => SplitQuality::Gini,
        SplitCriterion::Entropy => SplitQuality::Entropy,
    }
}

/// Fit a single linfa decision tree. Shared with the ensemble families.
pub(crate) fn fit_tree(
    x: &Array2<f64>,
    y: &Array1<usize>,
    criterion: SplitCriterion,
    max_depth: Option<usize>,
) -> Result<DecisionTree<f64, usize>> {
    let dataset = Dataset::new(x.clone(), y.clone());
    DecisionTree::params()
        .split_quality(split_quality(criterion))
        .max_depth(max_depth)
        .fit(&dataset)
        .or_kind(ErrorKind::Training, || "Failed to fit decision tree".to_string())
}

/// Single CART tree backed by `linfa-trees`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    criterion: SplitCriterion,
    max_depth: Option<usize>,
    model: Option<DecisionTree<f64, usize>>,
}

impl DecisionTreeClassifier {
    pub fn new(criterion: SplitCriterion, max_depth: Option<usize>) -> Self {
        Self {
            criterion,
            max_depth,
            model: None,
        }
    }
}

impl ClassifierModel for DecisionTreeClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        self.model = Some(fit_tree(x, y, self.criterion, self.max_depth)?);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PipelineError::training("decision tree is not fitted"))?;
        Ok(model.predict(x))
    }

    fn name(&self) -> &str {
        "Decision Tree"
    }
}
