use ndarray::{Array1, Array2};

use crate::error::Result;

/// Contract shared by every candidate classifier family.
///
/// Labels are class indices: `0` for legitimate, `1` for phishing.
pub trait ClassifierModel: Send + Sync {
    /// Fit the model on the full matrix `x` with labels `y`.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<()>;

    /// Predict a class index per row. Fails if the model has not been fitted.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>>;

    /// Human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
