//! Binary classification scores. Class `1` is the positive class; any ratio
//! with a zero denominator is reported as 0.
use ndarray::ArrayView1;

use crate::artifact::ClassificationMetricArtifact;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn from_labels(y_true: ArrayView1<'_, usize>, y_pred: ArrayView1<'_, usize>) -> Self {
        let mut counts = ConfusionCounts::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == 1, p == 1) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn accuracy(y_true: ArrayView1<'_, usize>, y_pred: ArrayView1<'_, usize>) -> f64 {
    let hits = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    ratio(hits, y_true.len())
}

pub fn precision(y_true: ArrayView1<'_, usize>, y_pred: ArrayView1<'_, usize>) -> f64 {
    let c = ConfusionCounts::from_labels(y_true, y_pred);
    ratio(c.tp, c.tp + c.fp)
}

pub fn recall(y_true: ArrayView1<'_, usize>, y_pred: ArrayView1<'_, usize>) -> f64 {
    let c = ConfusionCounts::from_labels(y_true, y_pred);
    ratio(c.tp, c.tp + c.fn_)
}

pub fn f1(y_true: ArrayView1<'_, usize>, y_pred: ArrayView1<'_, usize>) -> f64 {
    let c = ConfusionCounts::from_labels(y_true, y_pred);
    ratio(2 * c.tp, 2 * c.tp + c.fp + c.fn_)
}

/// f1, precision and recall in one pass.
pub fn classification_score(
    y_true: ArrayView1<'_, usize>,
    y_pred: ArrayView1<'_, usize>,
) -> ClassificationMetricArtifact {
    let c = ConfusionCounts::from_labels(y_true, y_pred);
    ClassificationMetricArtifact {
        f1_score: ratio(2 * c.tp, 2 * c.tp + c.fp + c.fn_),
        precision_score: ratio(c.tp, c.tp + c.fp),
        recall_score: ratio(c.tp, c.tp + c.fn_),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn scores_on_mixed_predictions() {
        let y_true = array![1usize, 1, 0, 0, 1, 0];
        let y_pred = array![1usize, 0, 0, 1, 1, 0];
        let m = classification_score(y_true.view(), y_pred.view());
        assert!((m.precision_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((accuracy(y_true.view(), y_pred.view()) - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(f1(y_true.view(), y_pred.view()), m.f1_score);
    }

    #[test]
    fn zero_denominators_yield_zero() {
        let y_true = array![0usize, 0, 0];
        let y_pred = array![0usize, 0, 0];
        assert_eq!(precision(y_true.view(), y_pred.view()), 0.0);
        assert_eq!(recall(y_true.view(), y_pred.view()), 0.0);
        assert_eq!(f1(y_true.view(), y_pred.view()), 0.0);
        assert_eq!(accuracy(y_true.view(), y_pred.view()), 1.0);
        let empty = ndarray::Array1::<usize>::zeros(0);
        assert_eq!(accuracy(empty.view(), empty.view()), 0.0);
    }
}
