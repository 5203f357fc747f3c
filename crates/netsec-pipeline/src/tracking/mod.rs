//! Experiment tracking handle.
//!
//! The pipeline receives a boxed [`ExperimentTracker`] from its caller and
//! closes it when the run ends, whether the run succeeded or not.
use crate::artifact::ClassificationMetricArtifact;
use crate::config::TrackerSettings;
use crate::error::Result;

pub mod local;
#[cfg(feature = "mlflow")]
pub mod mlflow;

pub use local::LocalTracker;
#[cfg(feature = "mlflow")]
pub use mlflow::MlflowTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }
}

pub trait ExperimentTracker: Send {
    /// Open a run and return its id.
    fn start_run(&mut self, name: &str) -> Result<String>;

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()>;

    /// Store `bytes` under the run at the relative `path`.
    fn log_artifact(&mut self, run_id: &str, path: &str, bytes: &[u8]) -> Result<()>;

    fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()>;

    /// Flush and release the handle. Called once per pipeline run.
    fn close(&mut self) -> Result<()>;
}

/// Tracker that records nothing.
#[derive(Debug, Default)]
pub struct NoopTracker {
    next_id: usize,
}

impl ExperimentTracker for NoopTracker {
    fn start_run(&mut self, _name: &str) -> Result<String> {
        self.next_id += 1;
        Ok(format!("noop-{}", self.next_id))
    }

    fn log_metric(&mut self, _run_id: &str, _key: &str, _value: f64) -> Result<()> {
        Ok(())
    }

    fn log_artifact(&mut self, _run_id: &str, _path: &str, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }

    fn end_run(&mut self, _run_id: &str, _status: RunStatus) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Build the tracker named by the settings.
pub fn from_settings(settings: &TrackerSettings) -> Result<Box<dyn ExperimentTracker>> {
    match settings {
        TrackerSettings::Local { dir } => Ok(Box::new(LocalTracker::new(dir)?)),
        #[cfg(feature = "mlflow")]
        TrackerSettings::Mlflow { experiment_id } => {
            Ok(Box::new(MlflowTracker::from_env(experiment_id.clone())?))
        }
        #[cfg(not(feature = "mlflow"))]
        TrackerSettings::Mlflow { .. } => Err(crate::error::PipelineError::config(
            "this build has no MLflow support; enable the `mlflow` feature",
        )),
        TrackerSettings::None => Ok(Box::new(NoopTracker::default())),
    }
}

/// Record one metric set as its own run, with the serialised model attached.
pub fn track_model(
    tracker: &mut dyn ExperimentTracker,
    run_name: &str,
    metrics: &ClassificationMetricArtifact,
    model_bytes: &[u8],
) -> Result<String> {
    let run_id = tracker.start_run(run_name)?;
    let outcome = log_run(tracker, &run_id, metrics, model_bytes);
    let status = if outcome.is_ok() {
        RunStatus::Finished
    } else {
        RunStatus::Failed
    };
    tracker.end_run(&run_id, status)?;
    outcome.map(|_| run_id)
}

fn log_run(
    tracker: &mut dyn ExperimentTracker,
    run_id: &str,
    metrics: &ClassificationMetricArtifact,
    model_bytes: &[u8],
) -> Result<()> {
    tracker.log_metric(run_id, "f1_score", metrics.f1_score)?;
    tracker.log_metric(run_id, "precision", metrics.precision_score)?;
    tracker.log_metric(run_id, "recall_score", metrics.recall_score)?;
    tracker.log_artifact(run_id, "model/model.bin", model_bytes)
}
