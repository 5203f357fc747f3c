//! MLflow REST client (`/api/2.0/mlflow`).
//!
//! Endpoint and credentials come from `MLFLOW_TRACKING_URI`,
//! `MLFLOW_TRACKING_USERNAME` and `MLFLOW_TRACKING_PASSWORD`. Artifacts are
//! uploaded through the tracking server's artifact proxy, so only runs whose
//! artifact URI uses the `mlflow-artifacts:` scheme can receive them.
use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;

use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::tracking::{ExperimentTracker, RunStatus};

const ARTIFACT_SCHEME: &str = "mlflow-artifacts:";

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: RunPayload,
}

#[derive(Debug, Deserialize)]
struct RunPayload {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
    #[serde(default)]
    artifact_uri: String,
}

#[derive(Debug)]
pub struct MlflowTracker {
    client: Client,
    base_url: String,
    experiment_id: String,
    credentials: Option<(String, String)>,
    /// run id -> artifact URI reported by the server
    artifact_uris: HashMap<String, String>,
}

impl MlflowTracker {
    pub fn new(
        base_url: impl Into<String>,
        experiment_id: impl Into<String>,
        credentials: Option<(String, String)>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .or_kind(ErrorKind::Tracking, || "Failed to build HTTP client".to_string())?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            experiment_id: experiment_id.into(),
            credentials,
            artifact_uris: HashMap::new(),
        })
    }

    /// Configure from the environment. `experiment_id` falls back to
    /// `MLFLOW_EXPERIMENT_ID`, then to the default experiment `"0"`.
    pub fn from_env(experiment_id: Option<String>) -> Result<Self> {
        let base_url = std::env::var("MLFLOW_TRACKING_URI").map_err(|_| {
            PipelineError::config("MLFLOW_TRACKING_URI must be set to use the MLflow tracker")
        })?;
        let experiment_id = experiment_id
            .or_else(|| std::env::var("MLFLOW_EXPERIMENT_ID").ok())
            .unwrap_or_else(|| "0".to_string());
        let credentials = match std::env::var("MLFLOW_TRACKING_USERNAME") {
            Ok(user) => Some((
                user,
                std::env::var("MLFLOW_TRACKING_PASSWORD").unwrap_or_default(),
            )),
            Err(_) => None,
        };
        log::info!("Tracking runs on {base_url} (experiment {experiment_id})");
        Self::new(base_url, experiment_id, credentials)
    }

    fn api(&self, endpoint: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, endpoint)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }

    fn post(&self, endpoint: &str, body: serde_json::Value) -> Result<reqwest::blocking::Response> {
        let url = self.api(endpoint);
        let response = self
            .authorize(self.client.post(&url).json(&body))
            .send()
            .or_kind(ErrorKind::Tracking, || format!("Request to {url} failed"))?;
        check_status(response, &url)
    }
}

fn check_status(
    response: reqwest::blocking::Response,
    url: &str,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(PipelineError::new(
        ErrorKind::Tracking,
        format!("{url} returned {status}: {body}"),
    ))
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl ExperimentTracker for MlflowTracker {
    fn start_run(&mut self, name: &str) -> Result<String> {
        let response = self.post(
            "runs/create",
            json!({
                "experiment_id": self.experiment_id,
                "run_name": name,
                "start_time": now_millis(),
                "tags": [{ "key": "mlflow.runName", "value": name }],
            }),
        )?;
        let created: CreateRunResponse = response
            .json()
            .or_kind(ErrorKind::Tracking, || "Malformed runs/create response".to_string())?;
        let info = created.run.info;
        log::debug!("Started MLflow run {} ({})", info.run_id, name);
        self.artifact_uris.insert(info.run_id.clone(), info.artifact_uri);
        Ok(info.run_id)
    }

    fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.post(
            "runs/log-metric",
            json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": now_millis(),
                "step": 0,
            }),
        )?;
        Ok(())
    }

    fn log_artifact(&mut self, run_id: &str, path: &str, bytes: &[u8]) -> Result<()> {
        let artifact_uri = self.artifact_uris.get(run_id).cloned().unwrap_or_default();
        let Some(location) = artifact_uri.strip_prefix(ARTIFACT_SCHEME) else {
            log::warn!(
                "Run {run_id} stores artifacts at '{artifact_uri}', which is not served by the \
                 tracking server; skipping {path}"
            );
            return Ok(());
        };
        let url = format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}",
            self.base_url,
            location.trim_matches('/'),
            path
        );
        let response = self
            .authorize(self.client.put(&url).body(bytes.to_vec()))
            .send()
            .or_kind(ErrorKind::Tracking, || format!("Upload to {url} failed"))?;
        check_status(response, &url)?;
        Ok(())
    }

    fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        self.post(
            "runs/update",
            json!({
                "run_id": run_id,
                "status": status.as_str(),
                "end_time": now_millis(),
            }),
        )?;
        self.artifact_uris.remove(run_id);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let open: Vec<String> = self.artifact_uris.keys().cloned().collect();
        for run_id in open {
            log::warn!("MLflow run {run_id} was still open at close, marking it failed");
            self.end_run(&run_id, RunStatus::Failed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_urls_are_normalised() {
        let tracker = MlflowTracker::new("http://localhost:5000/", "3", None).unwrap();
        assert_eq!(
            tracker.api("runs/create"),
            "http://localhost:5000/api/2.0/mlflow/runs/create"
        );
    }

    #[test]
    fn unreachable_server_is_a_tracking_error() {
        let mut tracker = MlflowTracker::new("http://127.0.0.1:9", "0", None).unwrap();
        let err = tracker.start_run("train").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Tracking);
        assert!(err.is_retryable());
    }
}
