//! netsec-pipeline: training pipeline for the network security (phishing URL)
//! classifier.
//!
//! Stages run strictly in order and hand off through files under a
//! timestamped run directory:
//!
//! 1. ingestion: documents from a [`source::DocumentSource`] to CSV train/test splits
//! 2. validation: column-count check and per-column KS drift report
//! 3. transformation: KNN imputation, NPY matrices, persisted preprocessor
//! 4. training: grid search over five classifier families, best model packaged
//!    with its preprocessor
//!
//! [`pipeline::TrainingPipeline`] wires them together.
pub mod artifact;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod layout;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod source;
pub mod stages;
pub mod stats;
pub mod sync;
pub mod tracking;

pub use error::{ErrorKind, PipelineError, Result};
pub use pipeline::TrainingPipeline;
