use anyhow::{Context, Result};

use netsec_pipeline::artifact::ModelTrainerArtifact;
use netsec_pipeline::source::{DocumentSource, JsonFileSource};
use netsec_pipeline::tracking;
use netsec_pipeline::TrainingPipeline;

use crate::config::{SourceKind, TrainConfig};

fn build_source(config: &TrainConfig) -> Result<Box<dyn DocumentSource>> {
    match config.source {
        SourceKind::Json => {
            let input = config
                .input
                .as_ref()
                .context("--input is required with the json source")?;
            Ok(Box::new(JsonFileSource::new(input)))
        }
        #[cfg(feature = "mongodb")]
        SourceKind::Mongo => Ok(Box::new(netsec_pipeline::source::MongoSource::from_env()?)),
        #[cfg(not(feature = "mongodb"))]
        SourceKind::Mongo => anyhow::bail!(
            "This build has no MongoDB support; rebuild with the `mongodb` feature or use --source json"
        ),
    }
}

/// Run every pipeline stage with the given configuration.
pub fn run_training(config: &TrainConfig) -> Result<ModelTrainerArtifact> {
    let source = build_source(config)?;
    log::info!("Reading records from {}", source.describe());
    let tracker = tracking::from_settings(&config.settings.tracker)?;
    let mut pipeline = TrainingPipeline::new(config.settings.clone(), source, tracker)?;
    let artifact = pipeline.run()?;
    Ok(artifact)
}
