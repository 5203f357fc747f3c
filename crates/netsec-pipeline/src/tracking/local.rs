use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::io::ensure_parent_dir;
use crate::tracking::{ExperimentTracker, RunStatus};

const RUN_FILE_NAME: &str = "run.json";

/// Contents of `<root>/<run_id>/run.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRun {
    pub run_id: String,
    pub name: String,
    pub status: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub metrics: BTreeMap<String, f64>,
    pub artifacts: Vec<String>,
}

/// Records each run as a directory on the local filesystem.
#[derive(Debug)]
pub struct LocalTracker {
    root: PathBuf,
    runs: HashMap<String, LocalRun>,
    counter: usize,
}

impl LocalTracker {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).or_kind(ErrorKind::Tracking, || {
            format!("Failed to create tracking directory {}", root.display())
        })?;
        Ok(Self {
            root,
            runs: HashMap::new(),
            counter: 0,
        })
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join(run_id)
    }

    fn run_mut(&mut self, run_id: &str) -> Result<&mut LocalRun> {
        self.runs.get_mut(run_id).ok_or_else(|| {
            PipelineError::new(ErrorKind::Tracking, format!("unknown run '{run_id}'"))
        })
    }

    fn persist(&self, run_id: &str) -> Result<()> {
        let run = self.runs.get(run_id).ok_or_else(|| {
            PipelineError::new(ErrorKind::Tracking, format!("unknown run '{run_id}'"))
        })?;
        let path = self.run_dir(run_id).join(RUN_FILE_NAME);
        ensure_parent_dir(&path)?;
        let json = serde_json::to_string_pretty(run)
            .or_kind(ErrorKind::Tracking, || "Failed to encode run record".to_string())?;
        std::fs::write(&path, json)
            .or_kind(ErrorKind::Tracking, || format!("Failed to write {}", path.display()))
    }

    pub fn load_run<P: AsRef<Path>>(run_dir: P) -> Result<LocalRun> {
        let path = run_dir.as_ref().join(RUN_FILE_NAME);
        let text = std::fs::read_to_string(&path)
            .or_kind(ErrorKind::Tracking, || format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .or_kind(ErrorKind::Tracking, || format!("Failed to parse {}", path.display()))
    }
}

impl ExperimentTracker for LocalTracker {
    fn start_run(&mut self, name: &str) -> Result<String> {
        self.counter += 1;
        let now = Local::now();
        let run_id = format!("{}_{}_{}", name, now.format("%Y%m%d%H%M%S%3f"), self.counter);
        self.runs.insert(
            run_id.clone(),
            LocalRun {
                run_id: run_id.clone(),
                name: name.to_string(),
                status: "RUNNING".to_string(),
                start_time: now.to_rfc3339(),
                end_time: None,
                metrics: BTreeMap::new(),
                artifacts: Vec::new(),
            },
        );
        self.persist(&run_id)?;
        log::debug!("Started local run {run_id}");
        Ok(run_id)
    }

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.run_mut(run_id)?.metrics.insert(key.to_string(), value);
        self.persist(run_id)
    }

    fn log_artifact(&mut self, run_id: &str, path: &str, bytes: &[u8]) -> Result<()> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(PipelineError::new(
                ErrorKind::Tracking,
                format!("artifact path '{path}' must be relative and stay inside the run"),
            ));
        }
        let target = self.run_dir(run_id).join("artifacts").join(relative);
        ensure_parent_dir(&target)?;
        std::fs::write(&target, bytes)
            .or_kind(ErrorKind::Tracking, || format!("Failed to write {}", target.display()))?;
        self.run_mut(run_id)?.artifacts.push(path.to_string());
        self.persist(run_id)
    }

    fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        let run = self.run_mut(run_id)?;
        run.status = status.as_str().to_string();
        run.end_time = Some(Local::now().to_rfc3339());
        self.persist(run_id)
    }

    fn close(&mut self) -> Result<()> {
        let open: Vec<String> = self
            .runs
            .values()
            .filter(|r| r.end_time.is_none())
            .map(|r| r.run_id.clone())
            .collect();
        for run_id in open {
            log::warn!("Run {run_id} was still open at close, marking it failed");
            self.end_run(&run_id, RunStatus::Failed)?;
        }
        log::debug!("Closed local tracker at {}", self.root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ClassificationMetricArtifact;
    use crate::tracking::track_model;

    #[test]
    fn run_directory_holds_metrics_and_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = LocalTracker::new(dir.path().join("mlruns")).unwrap();
        let metrics = ClassificationMetricArtifact {
            f1_score: 0.9,
            precision_score: 0.8,
            recall_score: 1.0,
        };
        let run_id = track_model(&mut tracker, "train", &metrics, b"model-bytes").unwrap();
        tracker.close().unwrap();

        let run_dir = tracker.run_dir(&run_id);
        let run = LocalTracker::load_run(&run_dir).unwrap();
        assert_eq!(run.name, "train");
        assert_eq!(run.status, "FINISHED");
        assert_eq!(run.metrics["f1_score"], 0.9);
        assert_eq!(run.metrics["recall_score"], 1.0);
        assert_eq!(run.artifacts, vec!["model/model.bin"]);
        let stored = std::fs::read(run_dir.join("artifacts/model/model.bin")).unwrap();
        assert_eq!(stored, b"model-bytes");
    }

    #[test]
    fn close_fails_open_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = LocalTracker::new(dir.path()).unwrap();
        let run_id = tracker.start_run("test").unwrap();
        tracker.close().unwrap();
        let run = LocalTracker::load_run(tracker.run_dir(&run_id)).unwrap();
        assert_eq!(run.status, "FAILED");
    }

    #[test]
    fn artifact_paths_cannot_escape() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = LocalTracker::new(dir.path()).unwrap();
        let run_id = tracker.start_run("x").unwrap();
        let err = tracker.log_artifact(&run_id, "../evil", b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Tracking);
    }
}
