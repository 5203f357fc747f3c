use anyhow::{Context, Result};
use ndarray::Array1;
use std::path::Path;

use netsec_pipeline::data_handling::Table;
use netsec_pipeline::io::csv_table::{read_table, write_table};
use netsec_pipeline::io::object::load_object;
use netsec_pipeline::layout::{final_model_path, final_preprocessor_path};
use netsec_pipeline::models::estimator::NetworkModel;
use netsec_pipeline::models::factory::Classifier;
use netsec_pipeline::preprocessing::Preprocessor;

use crate::util::validate_tsv_or_csv_file;

/// Name of the column appended to the input table.
pub const PREDICTION_COLUMN: &str = "predicted_column";

/// Rebuild the inference wrapper from the deployment directory.
pub fn load_network_model(model_dir: &Path) -> Result<NetworkModel> {
    let preprocessor: Preprocessor = load_object(final_preprocessor_path(model_dir))
        .with_context(|| format!("Failed to load preprocessor from {:?}", model_dir))?;
    let model: Classifier = load_object(final_model_path(model_dir))
        .with_context(|| format!("Failed to load model from {:?}", model_dir))?;
    Ok(NetworkModel::new(preprocessor, model))
}

/// Predict every row of `input` and write it to `output` with the
/// predictions appended. Returns the annotated table.
pub fn run_prediction(input: &Path, model_dir: &Path, output: &Path) -> Result<Table> {
    validate_tsv_or_csv_file(input)?;
    let table = read_table(input)?;
    log::info!("Predicting {} rows from {:?}", table.n_rows(), input);

    let network_model = load_network_model(model_dir)?;
    let predictions: Array1<f64> = network_model.predict_table(&table)?.mapv(|c| c as f64);
    let annotated = table.with_column(PREDICTION_COLUMN, &predictions)?;
    write_table(&annotated, output)?;
    log::info!("Wrote predictions to {:?}", output);
    Ok(annotated)
}
