use linfa::prelude::*;
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SplitCriterion;
use crate::error::{PipelineError, Result};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::decision_tree::fit_tree;

/// One bagged tree and the feature columns it was trained on.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct BaggedTree {
    features: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

/// Bootstrap-aggregated decision trees with per-tree feature subsampling
/// (`ceil(sqrt(n_features))` columns) and a majority vote.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    n_estimators: usize,
    max_depth: Option<usize>,
    seed: Option<u64>,
    trees: Vec<BaggedTree>,
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize, max_depth: Option<usize>, seed: Option<u64>) -> Self {
        Self {
            n_estimators,
            max_depth,
            seed,
            trees: Vec::new(),
        }
    }
}

impl ClassifierModel for RandomForestClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::training("random forest needs at least one tree"));
        }
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 || n_features == 0 {
            return Err(PipelineError::training("random forest got an empty training matrix"));
        }
        let n_sub = ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features);

        // draw every tree's seed up front so parallel fitting stays reproducible
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let tree_seeds: Vec<u64> = (0..self.n_estimators).map(|_| rng.gen()).collect();
        let max_depth = self.max_depth;

        let trees = tree_seeds
            .into_par_iter()
            .map(|tree_seed| {
                let mut rng = StdRng::seed_from_u64(tree_seed);
                let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
                let mut features = sample(&mut rng, n_features, n_sub).into_vec();
                features.sort_unstable();
                let x_boot = x.select(Axis(0), &rows).select(Axis(1), &features);
                let y_boot = y.select(Axis(0), &rows);
                let tree = fit_tree(&x_boot, &y_boot, SplitCriterion::Gini, max_depth)?;
                Ok(BaggedTree { features, tree })
            })
            .collect::<Result<Vec<_>>>()?;

        log::trace!("Fitted random forest with {} trees", trees.len());
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        if self.trees.is_empty() {
            return Err(PipelineError::training("random forest is not fitted"));
        }
        let mut votes = Array1::<usize>::zeros(x.nrows());
        for bagged in &self.trees {
            let pred: Array1<usize> = bagged.tree.predict(&x.select(Axis(1), &bagged.features));
            votes += &pred;
        }
        let n_trees = self.trees.len();
        Ok(votes.mapv(|v| usize::from(2 * v > n_trees)))
    }

    fn name(&self) -> &str {
        "Random Forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> (Array2<f64>, Array1<usize>) {
        let x = Array2::from_shape_fn((40, 3), |(r, c)| {
            let base = if r < 20 { 0.0 } else { 10.0 };
            base + ((r * 7 + c * 3) % 5) as f64 * 0.1
        });
        let y = Array1::from_shape_fn(40, |r| usize::from(r >= 20));
        (x, y)
    }

    #[test]
    fn separates_two_blobs() {
        let (x, y) = blobs();
        let mut forest = RandomForestClassifier::new(15, None, Some(3));
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.predict(&x).unwrap(), y);
    }

    #[test]
    fn seeded_forests_agree() {
        let (x, y) = blobs();
        let mut a = RandomForestClassifier::new(5, Some(2), Some(11));
        let mut b = RandomForestClassifier::new(5, Some(2), Some(11));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        let probe = Array2::from_shape_fn((10, 3), |(r, c)| (r + c) as f64);
        assert_eq!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
    }
}
