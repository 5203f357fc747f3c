use crate::artifact::{DataIngestionArtifact, DataValidationArtifact};
use crate::data_handling::Table;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::io::csv_table::{read_table, write_table};
use crate::io::schema::{ColumnDrift, DriftReport, Schema};
use crate::layout::DataValidationConfig;
use crate::stats::ks_2samp;

pub struct DataValidation {
    ingestion_artifact: DataIngestionArtifact,
    config: DataValidationConfig,
    schema: Schema,
}

impl DataValidation {
    /// Loads the schema file named by the config.
    pub fn new(ingestion_artifact: DataIngestionArtifact, config: DataValidationConfig) -> Result<Self> {
        let schema = Schema::load(&config.schema_file_path)?;
        Ok(Self::with_schema(ingestion_artifact, config, schema))
    }

    pub fn with_schema(
        ingestion_artifact: DataIngestionArtifact,
        config: DataValidationConfig,
        schema: Schema,
    ) -> Self {
        Self {
            ingestion_artifact,
            config,
            schema,
        }
    }

    /// True iff the table has exactly as many columns as the schema lists.
    pub fn validate_number_of_columns(&self, table: &Table) -> bool {
        log::info!("Required number of columns: {}", self.schema.column_count());
        log::info!("Table has columns: {}", table.n_cols());
        table.n_cols() == self.schema.column_count()
    }

    /// Two-sample KS test per feature column of `base` (every column but the
    /// target). Returns `true` when no column drifted, plus the report.
    pub fn detect_dataset_drift(&self, base: &Table, current: &Table) -> Result<(bool, DriftReport)> {
        let mut status = true;
        let mut report = DriftReport::default();
        for name in base.columns() {
            if *name == self.config.target_column {
                continue;
            }
            let base_col = base.column(name).map(|c| c.to_vec()).unwrap_or_default();
            let current_col = current.column(name).ok_or_else(|| {
                PipelineError::new(
                    ErrorKind::DriftComputation,
                    format!("column '{name}' is missing from the current table"),
                )
            })?;
            let result = ks_2samp(&base_col, &current_col.to_vec()).map_err(|e| {
                PipelineError::with_source(
                    ErrorKind::DriftComputation,
                    format!("drift test failed for column '{name}'"),
                    e,
                )
            })?;
            let drift_status = result.p_value < self.config.drift_threshold;
            if drift_status {
                status = false;
            }
            log::debug!(
                "{name}: KS statistic {:.4}, p-value {:.4}{}",
                result.statistic,
                result.p_value,
                if drift_status { " (drift)" } else { "" }
            );
            report.push(
                name.clone(),
                ColumnDrift {
                    p_value: result.p_value,
                    drift_status,
                },
            );
        }
        Ok((status, report))
    }

    fn check_columns(&self, table: &Table, split: &str) -> Result<()> {
        if self.validate_number_of_columns(table) {
            return Ok(());
        }
        let message = format!(
            "{split} table has {} columns, schema lists {}",
            table.n_cols(),
            self.schema.column_count()
        );
        if self.config.fail_on_schema_mismatch {
            return Err(PipelineError::new(ErrorKind::SchemaMismatch, message));
        }
        log::error!("{message}");
        Ok(())
    }

    pub fn initiate_data_validation(&self) -> Result<DataValidationArtifact> {
        let train = read_table(&self.ingestion_artifact.trained_file_path)?;
        let test = read_table(&self.ingestion_artifact.test_file_path)?;

        self.check_columns(&train, "Train")?;
        self.check_columns(&test, "Test")?;

        let (status, report) = self.detect_dataset_drift(&train, &test)?;
        report.write(&self.config.drift_report_file_path)?;
        let drifted = report.drifted_columns();
        if drifted.is_empty() {
            log::info!("No drift detected across {} columns", report.len());
        } else {
            log::warn!("Drift detected in {} columns: {}", drifted.len(), drifted.join(", "));
        }

        write_table(&train, &self.config.valid_train_file_path)?;
        write_table(&test, &self.config.valid_test_file_path)?;

        Ok(DataValidationArtifact {
            validation_status: status,
            valid_train_file_path: self.config.valid_train_file_path.clone(),
            valid_test_file_path: self.config.valid_test_file_path.clone(),
            invalid_train_file_path: None,
            invalid_test_file_path: None,
            drift_report_file_path: self.config.drift_report_file_path.clone(),
        })
    }
}
