//! Per-run file layout.
//!
//! A [`TrainingPipelineConfig`] is derived once from the settings and the run
//! timestamp; every stage config below is a pure function of it, so two runs
//! with different timestamps never share a path.
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::config::{ImputerSettings, PipelineSettings};

/// Timestamp format used for the run directory name.
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

pub const FEATURE_STORE_FILE_NAME: &str = "phisingData.csv";
pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";
pub const TRAIN_NPY_FILE_NAME: &str = "train.npy";
pub const TEST_NPY_FILE_NAME: &str = "test.npy";
pub const PREPROCESSING_OBJECT_FILE_NAME: &str = "preprocessing.bin";
pub const FINAL_PREPROCESSOR_FILE_NAME: &str = "preprocessor.bin";
pub const MODEL_FILE_NAME: &str = "model.bin";
pub const DRIFT_REPORT_FILE_NAME: &str = "report.yaml";

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPipelineConfig {
    pub pipeline_name: String,
    pub timestamp: String,
    /// `<artifact root>/<timestamp>`
    pub artifact_dir: PathBuf,
    /// Fixed deployment directory, overwritten by every run.
    pub model_dir: PathBuf,
}

impl TrainingPipelineConfig {
    pub fn new<Tz>(settings: &PipelineSettings, timestamp: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let timestamp = timestamp.format(TIMESTAMP_FORMAT).to_string();
        Self {
            pipeline_name: settings.pipeline_name.clone(),
            artifact_dir: settings.artifact_dir.join(&timestamp),
            model_dir: settings.final_model_dir.clone(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataIngestionConfig {
    pub data_ingestion_dir: PathBuf,
    pub feature_store_file_path: PathBuf,
    pub training_file_path: PathBuf,
    pub testing_file_path: PathBuf,
    pub train_test_split_ratio: f64,
    pub split_seed: Option<u64>,
    pub database_name: String,
    pub collection_name: String,
}

impl DataIngestionConfig {
    pub fn new(pipeline: &TrainingPipelineConfig, settings: &PipelineSettings) -> Self {
        let data_ingestion_dir = pipeline.artifact_dir.join("data_ingestion");
        let ingested = data_ingestion_dir.join("ingested");
        Self {
            feature_store_file_path: data_ingestion_dir
                .join("feature_store")
                .join(FEATURE_STORE_FILE_NAME),
            training_file_path: ingested.join(TRAIN_FILE_NAME),
            testing_file_path: ingested.join(TEST_FILE_NAME),
            data_ingestion_dir,
            train_test_split_ratio: settings.train_test_split_ratio,
            split_seed: settings.split_seed,
            database_name: settings.database_name.clone(),
            collection_name: settings.collection_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationConfig {
    pub data_validation_dir: PathBuf,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub invalid_train_file_path: PathBuf,
    pub invalid_test_file_path: PathBuf,
    pub drift_report_file_path: PathBuf,
    pub schema_file_path: PathBuf,
    /// Skipped by the drift test.
    pub target_column: String,
    pub drift_threshold: f64,
    pub fail_on_schema_mismatch: bool,
}

impl DataValidationConfig {
    pub fn new(pipeline: &TrainingPipelineConfig, settings: &PipelineSettings) -> Self {
        let dir = pipeline.artifact_dir.join("data_validation");
        let valid = dir.join("validated");
        let invalid = dir.join("invalid");
        Self {
            valid_train_file_path: valid.join(TRAIN_FILE_NAME),
            valid_test_file_path: valid.join(TEST_FILE_NAME),
            invalid_train_file_path: invalid.join(TRAIN_FILE_NAME),
            invalid_test_file_path: invalid.join(TEST_FILE_NAME),
            drift_report_file_path: dir.join("drift_report").join(DRIFT_REPORT_FILE_NAME),
            data_validation_dir: dir,
            schema_file_path: settings.schema_file.clone(),
            target_column: settings.target_column.clone(),
            drift_threshold: settings.drift_threshold,
            fail_on_schema_mismatch: settings.fail_on_schema_mismatch,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTransformationConfig {
    pub data_transformation_dir: PathBuf,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    pub transformed_object_file_path: PathBuf,
    pub final_preprocessor_file_path: PathBuf,
    pub target_column: String,
    pub imputer: ImputerSettings,
}

impl DataTransformationConfig {
    pub fn new(pipeline: &TrainingPipelineConfig, settings: &PipelineSettings) -> Self {
        let dir = pipeline.artifact_dir.join("data_transformation");
        let transformed = dir.join("transformed");
        Self {
            transformed_train_file_path: transformed.join(TRAIN_NPY_FILE_NAME),
            transformed_test_file_path: transformed.join(TEST_NPY_FILE_NAME),
            transformed_object_file_path: dir
                .join("transformed_object")
                .join(PREPROCESSING_OBJECT_FILE_NAME),
            final_preprocessor_file_path: final_preprocessor_path(&pipeline.model_dir),
            data_transformation_dir: dir,
            target_column: settings.target_column.clone(),
            imputer: settings.imputer.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelTrainerConfig {
    pub model_trainer_dir: PathBuf,
    pub trained_model_file_path: PathBuf,
    pub final_model_file_path: PathBuf,
    pub expected_score: Option<f64>,
    pub overfitting_threshold: f64,
    pub cv_folds: usize,
    pub model_seed: Option<u64>,
}

impl ModelTrainerConfig {
    pub fn new(pipeline: &TrainingPipelineConfig, settings: &PipelineSettings) -> Self {
        let dir = pipeline.artifact_dir.join("model_trainer");
        Self {
            trained_model_file_path: dir.join("trained_model").join(MODEL_FILE_NAME),
            final_model_file_path: final_model_path(&pipeline.model_dir),
            model_trainer_dir: dir,
            expected_score: settings.expected_score,
            overfitting_threshold: settings.overfitting_threshold,
            cv_folds: settings.cv_folds,
            model_seed: settings.model_seed,
        }
    }
}

pub fn final_preprocessor_path(model_dir: &Path) -> PathBuf {
    model_dir.join(FINAL_PREPROCESSOR_FILE_NAME)
}

pub fn final_model_path(model_dir: &Path) -> PathBuf {
    model_dir.join(MODEL_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn every_stage_path_lives_under_the_run_directory() {
        let settings = PipelineSettings {
            artifact_dir: PathBuf::from("/tmp/arts"),
            ..PipelineSettings::default()
        };
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let pipeline = TrainingPipelineConfig::new(&settings, &ts);
        assert_eq!(pipeline.timestamp, "03_09_2024_14_05_07");
        assert_eq!(pipeline.artifact_dir, PathBuf::from("/tmp/arts/03_09_2024_14_05_07"));

        let ingestion = DataIngestionConfig::new(&pipeline, &settings);
        assert_eq!(
            ingestion.feature_store_file_path,
            PathBuf::from("/tmp/arts/03_09_2024_14_05_07/data_ingestion/feature_store/phisingData.csv")
        );
        assert!(ingestion.training_file_path.ends_with("data_ingestion/ingested/train.csv"));

        let validation = DataValidationConfig::new(&pipeline, &settings);
        assert!(validation
            .drift_report_file_path
            .ends_with("data_validation/drift_report/report.yaml"));
        assert!(validation.invalid_test_file_path.ends_with("data_validation/invalid/test.csv"));

        let transformation = DataTransformationConfig::new(&pipeline, &settings);
        assert!(transformation
            .transformed_object_file_path
            .ends_with("data_transformation/transformed_object/preprocessing.bin"));
        assert_eq!(
            transformation.final_preprocessor_file_path,
            PathBuf::from("final_model/preprocessor.bin")
        );

        let trainer = ModelTrainerConfig::new(&pipeline, &settings);
        assert!(trainer
            .trained_model_file_path
            .starts_with(&pipeline.artifact_dir));
        assert_eq!(trainer.final_model_file_path, PathBuf::from("final_model/model.bin"));
    }
}
