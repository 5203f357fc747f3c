//! Missing-value imputation fitted on training features.
//!
//! [`KnnImputer`] fills each missing entry from the nearest training rows
//! under the nan-euclidean distance; [`Preprocessor`] wraps it together with
//! the feature column names so that inference can line up columns by name.
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::config::{ImputerSettings, ImputerWeights};
use crate::data_handling::Table;
use crate::error::{ErrorKind, PipelineError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnnImputer {
    n_neighbors: usize,
    weights: ImputerWeights,
    /// Training rows; the only rows ever used as donors.
    fit_x: Array2<f64>,
    /// Per-column mean of observed training values, used when no donor exists.
    column_means: Vec<f64>,
}

impl KnnImputer {
    pub fn new(settings: &ImputerSettings) -> Self {
        Self {
            n_neighbors: settings.n_neighbors.max(1),
            weights: settings.weights,
            fit_x: Array2::zeros((0, 0)),
            column_means: Vec::new(),
        }
    }

    pub fn n_features(&self) -> usize {
        self.column_means.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(PipelineError::new(
                ErrorKind::Imputation,
                "cannot fit imputer on an empty matrix",
            ));
        }
        self.column_means = x
            .columns()
            .into_iter()
            .enumerate()
            .map(|(c, col)| {
                let observed: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
                if observed.is_empty() {
                    log::warn!("Feature column {c} has no observed values, imputing 0");
                    0.0
                } else {
                    observed.mean()
                }
            })
            .collect();
        self.fit_x = x.clone();
        log::debug!(
            "Fitted KNN imputer on {} rows (k={}, weights={:?})",
            x.nrows(),
            self.n_neighbors,
            self.weights
        );
        Ok(())
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.column_means.is_empty() {
            return Err(PipelineError::new(ErrorKind::Imputation, "imputer is not fitted"));
        }
        if x.ncols() != self.n_features() {
            return Err(PipelineError::new(
                ErrorKind::Imputation,
                format!(
                    "imputer was fitted on {} features, got {}",
                    self.n_features(),
                    x.ncols()
                ),
            ));
        }

        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|r| self.impute_row(x.row(r)))
            .collect();

        let mut out = x.clone();
        for (r, row) in rows.into_iter().enumerate() {
            for (c, v) in row.into_iter().enumerate() {
                out[(r, c)] = v;
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    fn impute_row(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut out = row.to_vec();
        if !row.iter().any(|v| v.is_nan()) {
            return out;
        }
        let distances: Vec<f64> = self
            .fit_x
            .rows()
            .into_iter()
            .map(|donor| nan_euclidean(row, donor))
            .collect();

        for (c, value) in out.iter_mut().enumerate() {
            if !value.is_nan() {
                continue;
            }
            let mut donors: Vec<(f64, f64)> = distances
                .iter()
                .enumerate()
                .filter_map(|(i, &d)| {
                    let v = self.fit_x[(i, c)];
                    (!d.is_nan() && !v.is_nan()).then_some((d, v))
                })
                .collect();
            if donors.is_empty() {
                *value = self.column_means[c];
                continue;
            }
            // stable sort keeps the lower row index first on equal distance
            donors.sort_by(|a, b| a.0.total_cmp(&b.0));
            donors.truncate(self.n_neighbors);
            *value = self.combine(&donors);
        }
        out
    }

    fn combine(&self, donors: &[(f64, f64)]) -> f64 {
        match self.weights {
            ImputerWeights::Uniform => {
                donors.iter().map(|&(_, v)| v).sum::<f64>() / donors.len() as f64
            }
            ImputerWeights::Distance => {
                let exact: Vec<f64> = donors
                    .iter()
                    .filter(|(d, _)| *d == 0.0)
                    .map(|&(_, v)| v)
                    .collect();
                if !exact.is_empty() {
                    return exact.iter().sum::<f64>() / exact.len() as f64;
                }
                let (num, den) = donors
                    .iter()
                    .fold((0.0, 0.0), |(num, den), &(d, v)| (num + v / d, den + 1.0 / d));
                num / den
            }
        }
    }
}

/// Euclidean distance over coordinates present in both rows, scaled up by
/// `sqrt(n_features / n_present)`. `NaN` when no coordinate is shared.
pub fn nan_euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let mut sum = 0.0;
    let mut present = 0usize;
    for (&x, &y) in a.iter().zip(b.iter()) {
        if !x.is_nan() && !y.is_nan() {
            sum += (x - y) * (x - y);
            present += 1;
        }
    }
    if present == 0 {
        return f64::NAN;
    }
    (sum * a.len() as f64 / present as f64).sqrt()
}

/// Fitted feature preprocessing, persisted next to the model and reused at
/// inference time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Preprocessor {
    feature_columns: Vec<String>,
    imputer: KnnImputer,
}

impl Preprocessor {
    /// Fit on the training features only.
    pub fn fit(features: &Table, settings: &ImputerSettings) -> Result<Self> {
        let mut imputer = KnnImputer::new(settings);
        imputer.fit(features.values())?;
        Ok(Self {
            feature_columns: features.columns().to_vec(),
            imputer,
        })
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Transform a matrix whose columns are already in training order.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.imputer.transform(x)
    }

    /// Select the training feature columns by name, then transform.
    pub fn transform_table(&self, table: &Table) -> Result<Array2<f64>> {
        let selected = table.select_columns(&self.feature_columns)?;
        self.imputer.transform(selected.values())
    }
}
