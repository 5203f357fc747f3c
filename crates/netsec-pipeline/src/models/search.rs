//! Exhaustive grid search with stratified k-fold cross-validation, and the
//! family-level evaluation that produces the model report.
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;

use crate::config::{ModelType, SearchSpace};
use crate::error::{PipelineError, Result};
use crate::metrics::accuracy;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::factory::{build_model, Classifier};

/// Deterministic stratified folds.
///
/// Rows of each class are dealt round-robin in index order, so the i-th row of
/// a class lands in fold `i % k`. Returns the held-out row indices per fold.
pub fn stratified_folds(y: &Array1<usize>, k: usize) -> Vec<Vec<usize>> {
    let mut folds = vec![Vec::new(); k];
    let mut seen_per_class: Vec<usize> = Vec::new();
    for (i, &class) in y.iter().enumerate() {
        if class >= seen_per_class.len() {
            seen_per_class.resize(class + 1, 0);
        }
        folds[seen_per_class[class] % k].push(i);
        seen_per_class[class] += 1;
    }
    for fold in folds.iter_mut() {
        fold.sort_unstable();
    }
    folds
}

/// Mean held-out accuracy of one configuration over the given folds.
pub fn cross_val_accuracy(
    model_type: &ModelType,
    x: &Array2<f64>,
    y: &Array1<usize>,
    folds: &[Vec<usize>],
    seed: Option<u64>,
) -> Result<f64> {
    let mut total = 0.0;
    for held_out in folds {
        let mut is_held_out = vec![false; x.nrows()];
        held_out.iter().for_each(|&i| is_held_out[i] = true);
        let train_idx: Vec<usize> = (0..x.nrows()).filter(|&i| !is_held_out[i]).collect();

        let mut model = build_model(model_type, seed);
        model.fit(&x.select(Axis(0), &train_idx), &y.select(Axis(0), &train_idx))?;
        let pred = model.predict(&x.select(Axis(0), held_out))?;
        total += accuracy(y.select(Axis(0), held_out).view(), pred.view());
    }
    Ok(total / folds.len() as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub params: ModelType,
    pub cv_score: f64,
    /// Configurations that could be fitted on every fold.
    pub evaluated: usize,
}

/// Cross-validate every configuration of `space` in parallel and keep the best
/// (first on ties). Configurations that fail to fit are skipped.
pub fn grid_search(
    space: &SearchSpace,
    x: &Array2<f64>,
    y: &Array1<usize>,
    cv_folds: usize,
    seed: Option<u64>,
) -> Result<SearchOutcome> {
    if x.nrows() < cv_folds {
        return Err(PipelineError::training(format!(
            "{} rows are too few for {}-fold cross-validation",
            x.nrows(),
            cv_folds
        )));
    }
    let folds = stratified_folds(y, cv_folds);
    let candidates = space.candidates();
    let scores: Vec<Option<f64>> = candidates
        .par_iter()
        .map(|params| match cross_val_accuracy(params, x, y, &folds, seed) {
            Ok(score) => {
                log::trace!("{:?}: cv accuracy {:.4}", params, score);
                Some(score)
            }
            Err(e) => {
                log::warn!("Skipping {:?}: {}", params, e);
                None
            }
        })
        .collect();

    let evaluated = scores.iter().filter(|s| s.is_some()).count();
    let best = select_best(scores.iter().map(|s| s.unwrap_or(f64::NAN))).ok_or_else(|| {
        PipelineError::training(format!(
            "no {} configuration could be fitted",
            space.family()
        ))
    })?;
    Ok(SearchOutcome {
        params: candidates[best].clone(),
        cv_score: scores[best].unwrap_or(f64::NAN),
        evaluated,
    })
}

/// Index of the first maximum. `NaN` entries never win; `None` if every entry
/// is `NaN` or the input is empty.
pub fn select_best<I: IntoIterator<Item = f64>>(scores: I) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.into_iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if score <= b => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// One family after search and refit.
#[derive(Debug)]
pub struct EvaluatedFamily {
    pub family: &'static str,
    pub params: ModelType,
    pub cv_score: f64,
    /// Accuracy of the refitted best configuration on the test split.
    pub test_score: f64,
    pub model: Classifier,
}

/// Search every family in `spaces`, refit each winner on the full training
/// set and score it on the test split. Families that cannot be fitted at all
/// are left out of the report.
pub fn evaluate_models(
    x_train: &Array2<f64>,
    y_train: &Array1<usize>,
    x_test: &Array2<f64>,
    y_test: &Array1<usize>,
    spaces: &[SearchSpace],
    cv_folds: usize,
    seed: Option<u64>,
) -> Result<Vec<EvaluatedFamily>> {
    let mut report = Vec::with_capacity(spaces.len());
    for space in spaces {
        let family = space.family();
        let outcome = match grid_search(space, x_train, y_train, cv_folds, seed) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Dropping {family}: {e}");
                continue;
            }
        };
        let mut model = build_model(&outcome.params, seed);
        if let Err(e) = model.fit(x_train, y_train) {
            log::warn!("Dropping {family}: refit failed: {e}");
            continue;
        }
        let test_score = accuracy(y_test.view(), model.predict(x_test)?.view());
        log::info!(
            "{family}: best of {} configurations {:?}, cv accuracy {:.4}, test accuracy {:.4}",
            outcome.evaluated,
            outcome.params,
            outcome.cv_score,
            test_score
        );
        report.push(EvaluatedFamily {
            family,
            params: outcome.params,
            cv_score: outcome.cv_score,
            test_score,
            model,
        });
    }
    if report.is_empty() {
        return Err(PipelineError::training("no candidate model could be trained"));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitCriterion;
    use ndarray::array;

    #[test]
    fn folds_are_stratified_and_cover_every_row() {
        let y = array![0usize, 1, 0, 1, 0, 1, 0, 0, 1];
        let folds = stratified_folds(&y, 3);
        assert_eq!(folds, vec![vec![0, 1, 6, 8], vec![2, 3, 7], vec![4, 5]]);
        let mut all: Vec<usize> = folds.concat();
        all.sort_unstable();
        assert_eq!(all, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn select_best_takes_first_maximum() {
        assert_eq!(select_best(vec![0.7, 0.9, 0.9, 0.1]), Some(1));
        assert_eq!(select_best(vec![f64::NAN, 0.2]), Some(1));
        assert_eq!(select_best(vec![f64::NAN]), None);
        assert_eq!(select_best(Vec::<f64>::new()), None);
    }

    #[test]
    fn grid_search_picks_a_working_configuration() {
        let x = Array2::from_shape_fn((30, 2), |(r, c)| {
            let offset = if r < 15 { 0.0 } else { 5.0 };
            offset + c as f64 + (r % 3) as f64 * 0.1
        });
        let y = Array1::from_shape_fn(30, |r| usize::from(r >= 15));
        let space = SearchSpace::DecisionTree {
            criterion: vec![SplitCriterion::Gini, SplitCriterion::Entropy],
        };
        let outcome = grid_search(&space, &x, &y, 3, Some(0)).unwrap();
        assert_eq!(outcome.evaluated, 2);
        assert_eq!(outcome.cv_score, 1.0);
        // both score 1.0, the first configuration wins
        assert!(matches!(
            outcome.params,
            ModelType::DecisionTree {
                criterion: SplitCriterion::Gini,
                ..
            }
        ));
    }

    #[test]
    fn unfittable_families_are_dropped() {
        let x = Array2::from_shape_fn((12, 1), |(r, _)| r as f64);
        let y = Array1::from_shape_fn(12, |r| usize::from(r >= 6));
        let spaces = vec![
            SearchSpace::RandomForest {
                n_estimators: vec![0],
            },
            SearchSpace::DecisionTree { criterion: vec![] },
        ];
        let report = evaluate_models(&x, &y, &x, &y, &spaces, 3, Some(1)).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].family, "Decision Tree");
        assert_eq!(report[0].test_score, 1.0);
    }
}
