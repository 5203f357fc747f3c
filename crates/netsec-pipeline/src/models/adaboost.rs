use linfa::prelude::*;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::SplitCriterion;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::decision_tree::fit_tree;

/// Binary SAMME boosting over depth-1 trees.
///
/// Each round fits a stump on a resample drawn with the current sample
/// weights, then up-weights the rows it got wrong by `exp(alpha)` where
/// `alpha = learning_rate * ln((1 - err) / err)`. Boosting stops early once a
/// stump is perfect or no better than chance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    learning_rate: f64,
    n_estimators: usize,
    seed: Option<u64>,
    stumps: Vec<(f64, DecisionTree<f64, usize>)>,
}

impl AdaBoostClassifier {
    pub fn new(learning_rate: f64, n_estimators: usize, seed: Option<u64>) -> Self {
        Self {
            learning_rate,
            n_estimators,
            seed,
            stumps: Vec::new(),
        }
    }

    pub fn n_rounds(&self) -> usize {
        self.stumps.len()
    }
}

impl ClassifierModel for AdaBoostClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        let n = x.nrows();
        if n == 0 {
            return Err(PipelineError::training("AdaBoost got an empty training matrix"));
        }
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut weights = vec![1.0 / n as f64; n];
        let mut stumps = Vec::with_capacity(self.n_estimators);

        for round in 0..self.n_estimators {
            let dist = WeightedIndex::new(&weights).map_err(|e| {
                PipelineError::with_source(
                    ErrorKind::Training,
                    format!("invalid sample weights in round {round}"),
                    e,
                )
            })?;
            let rows: Vec<usize> = (0..n).map(|_| dist.sample(&mut rng)).collect();
            let stump = fit_tree(
                &x.select(Axis(0), &rows),
                &y.select(Axis(0), &rows),
                SplitCriterion::Gini,
                Some(1),
            )?;

            let pred: Array1<usize> = stump.predict(x);
            let missed: Vec<bool> = pred.iter().zip(y.iter()).map(|(p, t)| p != t).collect();
            let total: f64 = weights.iter().sum();
            let err = weights
                .iter()
                .zip(&missed)
                .filter(|(_, m)| **m)
                .map(|(w, _)| w)
                .sum::<f64>()
                / total;

            if err <= 0.0 {
                stumps.push((1.0, stump));
                log::trace!("AdaBoost stopped at round {round}: perfect stump");
                break;
            }
            if err >= 0.5 {
                log::trace!("AdaBoost stopped at round {round}: error {err:.3} is no better than chance");
                break;
            }

            let alpha = self.learning_rate * ((1.0 - err) / err).ln();
            for (w, &m) in weights.iter_mut().zip(&missed) {
                if m {
                    *w *= alpha.exp();
                }
            }
            let total: f64 = weights.iter().sum();
            weights.iter_mut().for_each(|w| *w /= total);
            stumps.push((alpha, stump));
        }

        if stumps.is_empty() {
            return Err(PipelineError::training(
                "AdaBoost could not find a stump better than chance",
            ));
        }
        self.stumps = stumps;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        if self.stumps.is_empty() {
            return Err(PipelineError::training("AdaBoost is not fitted"));
        }
        let mut score = Array1::<f64>::zeros(x.nrows());
        for (alpha, stump) in &self.stumps {
            let pred: Array1<usize> = stump.predict(x);
            score
                .iter_mut()
                .zip(pred.iter())
                .for_each(|(s, &p)| *s += if p == 1 { *alpha } else { -*alpha });
        }
        Ok(score.mapv(|s| usize::from(s > 0.0)))
    }

    fn name(&self) -> &str {
        "AdaBoost"
    }
}
