//! Orchestrates ingestion, validation, transformation and training in order,
//! stopping at the first failure, then syncs the outputs to S3.
use chrono::Local;

use crate::artifact::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact, ModelTrainerArtifact,
};
use crate::config::PipelineSettings;
use crate::error::Result;
use crate::layout::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelTrainerConfig,
    TrainingPipelineConfig,
};
use crate::source::DocumentSource;
use crate::stages::{DataIngestion, DataTransformation, DataValidation, ModelTrainer};
use crate::sync::{artifact_url, final_model_url, AwsCliSync, CloudSync};
use crate::tracking::ExperimentTracker;

pub struct TrainingPipeline {
    settings: PipelineSettings,
    config: TrainingPipelineConfig,
    source: Box<dyn DocumentSource>,
    tracker: Box<dyn ExperimentTracker>,
    cloud_sync: Box<dyn CloudSync>,
}

impl TrainingPipeline {
    /// Build a pipeline whose run directory is stamped with the current time.
    pub fn new(
        settings: PipelineSettings,
        source: Box<dyn DocumentSource>,
        tracker: Box<dyn ExperimentTracker>,
    ) -> Result<Self> {
        settings.validate()?;
        let config = TrainingPipelineConfig::new(&settings, &Local::now());
        Ok(Self {
            settings,
            config,
            source,
            tracker,
            cloud_sync: Box::new(AwsCliSync::default()),
        })
    }

    /// Replace the S3 sync backend.
    pub fn with_cloud_sync(mut self, cloud_sync: Box<dyn CloudSync>) -> Self {
        self.cloud_sync = cloud_sync;
        self
    }

    pub fn config(&self) -> &TrainingPipelineConfig {
        &self.config
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn start_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        log::info!("Start data ingestion");
        let config = DataIngestionConfig::new(&self.config, &self.settings);
        let artifact = DataIngestion::new(config, &*self.source).initiate_data_ingestion()?;
        log::info!("Data ingestion completed: {:?}", artifact);
        Ok(artifact)
    }

    pub fn start_data_validation(
        &self,
        ingestion_artifact: DataIngestionArtifact,
    ) -> Result<DataValidationArtifact> {
        log::info!("Start data validation");
        let config = DataValidationConfig::new(&self.config, &self.settings);
        let artifact = DataValidation::new(ingestion_artifact, config)?.initiate_data_validation()?;
        log::info!("Data validation completed: {:?}", artifact);
        Ok(artifact)
    }

    pub fn start_data_transformation(
        &self,
        validation_artifact: DataValidationArtifact,
    ) -> Result<DataTransformationArtifact> {
        log::info!("Start data transformation");
        let config = DataTransformationConfig::new(&self.config, &self.settings);
        let artifact =
            DataTransformation::new(validation_artifact, config).initiate_data_transformation()?;
        log::info!("Data transformation completed: {:?}", artifact);
        Ok(artifact)
    }

    pub fn start_model_trainer(
        &mut self,
        transformation_artifact: DataTransformationArtifact,
    ) -> Result<ModelTrainerArtifact> {
        log::info!("Start model training");
        let config = ModelTrainerConfig::new(&self.config, &self.settings);
        let mut trainer = ModelTrainer::new(
            transformation_artifact,
            config,
            self.settings.search_spaces.clone(),
            &mut *self.tracker,
        );
        let artifact = trainer.initiate_model_trainer()?;
        log::info!("Model training completed");
        Ok(artifact)
    }

    /// Upload the run directory. Failures are logged, never returned.
    pub fn sync_artifact_dir_to_s3(&self, bucket: &str) {
        let url = artifact_url(bucket, &self.config.timestamp);
        match self.cloud_sync.sync_folder_to(&self.config.artifact_dir, &url) {
            Ok(()) => log::info!("Synced {} to {}", self.config.artifact_dir.display(), url),
            Err(e) => log::warn!("Artifact sync to {url} failed: {e}"),
        }
    }

    /// Upload the final model directory. Failures are logged, never returned.
    pub fn sync_saved_model_dir_to_s3(&self, bucket: &str) {
        let url = final_model_url(bucket, &self.config.timestamp);
        match self.cloud_sync.sync_folder_to(&self.config.model_dir, &url) {
            Ok(()) => log::info!("Synced {} to {}", self.config.model_dir.display(), url),
            Err(e) => log::warn!("Final model sync to {url} failed: {e}"),
        }
    }

    fn run_stages(&mut self) -> Result<ModelTrainerArtifact> {
        let ingestion_artifact = self.start_data_ingestion()?;
        let validation_artifact = self.start_data_validation(ingestion_artifact)?;
        let transformation_artifact = self.start_data_transformation(validation_artifact)?;
        self.start_model_trainer(transformation_artifact)
    }

    /// Run every stage. The tracker is closed afterwards whatever the outcome.
    pub fn run(&mut self) -> Result<ModelTrainerArtifact> {
        log::info!(
            "Starting {} run {} in {}",
            self.config.pipeline_name,
            self.config.timestamp,
            self.config.artifact_dir.display()
        );
        let outcome = self.run_stages();
        if let Err(e) = self.tracker.close() {
            log::warn!("Failed to close experiment tracker: {e}");
        }
        let artifact = outcome?;

        match self.settings.bucket.clone() {
            Some(bucket) => {
                self.sync_artifact_dir_to_s3(&bucket);
                self.sync_saved_model_dir_to_s3(&bucket);
            }
            None => log::debug!("No bucket configured, skipping S3 sync"),
        }
        Ok(artifact)
    }
}
