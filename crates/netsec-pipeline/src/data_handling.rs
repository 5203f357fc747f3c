//! In-memory tabular data and the row/column operations the stages need.
//!
//! A [`Table`] is a list of column names and a dense `f64` matrix; missing
//! values are `NaN`. Documents from the source are flattened into this shape
//! once, at ingestion, and every later stage works on it (or re-reads it from
//! CSV).
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::{Map, Value};
use statrs::statistics::Statistics;

use crate::error::{ErrorKind, PipelineError, Result};

/// Identity column assigned by the document store.
pub const ID_COLUMN: &str = "_id";

/// Literal string tokens read as a missing value.
pub const MISSING_TOKENS: [&str; 6] = ["", "na", "NA", "nan", "NaN", "null"];

pub fn is_missing_token(s: &str) -> bool {
    MISSING_TOKENS.contains(&s.trim())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl Table {
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(PipelineError::data_format(format!(
                "{} column names for a matrix with {} columns",
                columns.len(),
                values.ncols()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Flatten documents into a table.
    ///
    /// Columns appear in order of first appearance across all documents and
    /// [`ID_COLUMN`] is dropped. Numbers, booleans and numeric strings become
    /// values; `null`, absent keys and the token `"na"` become `NaN`.
    pub fn from_documents(documents: &[Map<String, Value>]) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        for doc in documents {
            for key in doc.keys() {
                if key != ID_COLUMN && !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut values = Array2::from_elem((documents.len(), columns.len()), f64::NAN);
        for (r, doc) in documents.iter().enumerate() {
            for (c, name) in columns.iter().enumerate() {
                if let Some(v) = doc.get(name) {
                    values[(r, c)] = json_to_f64(v).map_err(|msg| {
                        PipelineError::data_format(format!("document {r}, field '{name}': {msg}"))
                    })?;
                }
            }
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|i| self.values.column(i))
    }

    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }

    /// Select columns by name, in the order given.
    pub fn select_columns(&self, names: &[String]) -> Result<Table> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let idx = self.column_index(name).ok_or_else(|| {
                PipelineError::new(
                    ErrorKind::SchemaMismatch,
                    format!("column '{name}' is missing from the input table"),
                )
            })?;
            indices.push(idx);
        }
        Ok(Table {
            columns: names.to_vec(),
            values: self.values.select(Axis(1), &indices),
        })
    }

    /// Split off the target column. A missing target value is an error.
    pub fn split_target(&self, target: &str) -> Result<(Table, Array1<f64>)> {
        let idx = self.column_index(target).ok_or_else(|| {
            PipelineError::new(
                ErrorKind::SchemaMismatch,
                format!("target column '{target}' not found"),
            )
        })?;
        let y = self.values.column(idx).to_owned();
        if let Some(row) = y.iter().position(|v| v.is_nan()) {
            return Err(PipelineError::data_format(format!(
                "target column '{target}' is missing a value in row {row}"
            )));
        }
        let keep: Vec<usize> = (0..self.n_cols()).filter(|&c| c != idx).collect();
        let features = Table {
            columns: keep.iter().map(|&c| self.columns[c].clone()).collect(),
            values: self.values.select(Axis(1), &keep),
        };
        Ok((features, y))
    }

    /// Append a column, returning a new table.
    pub fn with_column(&self, name: &str, column: &Array1<f64>) -> Result<Table> {
        if column.len() != self.n_rows() {
            return Err(PipelineError::data_format(format!(
                "column '{name}' has {} values for {} rows",
                column.len(),
                self.n_rows()
            )));
        }
        let mut values = Array2::zeros((self.n_rows(), self.n_cols() + 1));
        values
            .slice_mut(ndarray::s![.., ..self.n_cols()])
            .assign(&self.values);
        values.column_mut(self.n_cols()).assign(column);
        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        Ok(Table { columns, values })
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    pub fn log_summary(&self, label: &str) {
        log::info!(
            "{}: {} rows x {} columns, {} missing values",
            label,
            self.n_rows(),
            self.n_cols(),
            self.missing_count()
        );
        for (name, col) in self.columns.iter().zip(self.values.columns()) {
            let observed: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
            if observed.is_empty() {
                log::trace!("  {name}: no observed values");
                continue;
            }
            log::trace!(
                "  {name}: mean={:.4} std={:.4}",
                observed.iter().mean(),
                observed.iter().std_dev()
            );
        }
    }
}

fn json_to_f64(v: &Value) -> std::result::Result<f64, String> {
    match v {
        Value::Null => Ok(f64::NAN),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("number {n} is not representable as f64")),
        Value::String(s) if is_missing_token(s) => Ok(f64::NAN),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("non-numeric value '{s}'")),
        Value::Array(_) | Value::Object(_) => Err("nested values are not supported".to_string()),
    }
}

/// Shuffle rows and split them into `(train, test)`.
///
/// `ceil(ratio * n)` rows go to the test split; the rest go to train.
pub fn split_train_test(table: &Table, ratio: f64, seed: Option<u64>) -> (Table, Table) {
    let n = table.n_rows();
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * ratio).ceil() as usize;
    let n_test = n_test.min(n);
    let (test_idx, train_idx) = indices.split_at(n_test);
    (table.select_rows(train_idx), table.select_rows(test_idx))
}

/// Map the `-1` label to `0`; every other value is left as is.
pub fn remap_labels(y: &Array1<f64>) -> Array1<f64> {
    y.mapv(|v| if v == -1.0 { 0.0 } else { v })
}

/// Interpret a float label column as class indices. Only 0 and 1 are valid.
pub fn labels_to_classes(y: ArrayView1<'_, f64>) -> Result<Array1<usize>> {
    y.iter()
        .enumerate()
        .map(|(i, &v)| {
            if v == 0.0 {
                Ok(0)
            } else if v == 1.0 {
                Ok(1)
            } else {
                Err(PipelineError::data_format(format!(
                    "label {v} in row {i} is not a binary class (0 or 1)"
                )))
            }
        })
        .collect()
}
