mod common;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use netsec_pipeline::io::csv_table::read_table;
use netsec_pipeline::io::npy::load_array;
use netsec_pipeline::io::object::load_object;
use netsec_pipeline::io::schema::DriftReport;
use netsec_pipeline::layout::{final_model_path, final_preprocessor_path};
use netsec_pipeline::models::classifier_trait::ClassifierModel;
use netsec_pipeline::models::estimator::NetworkModel;
use netsec_pipeline::models::factory::Classifier;
use netsec_pipeline::preprocessing::Preprocessor;
use netsec_pipeline::source::JsonFileSource;
use netsec_pipeline::sync::{CloudSync, SyncError};
use netsec_pipeline::tracking::{self, LocalTracker, NoopTracker};
use netsec_pipeline::{ErrorKind, TrainingPipeline};

use common::{phishing_records, test_settings, write_records};

#[derive(Clone, Default)]
struct RecordingSync {
    calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    fail: bool,
}

impl CloudSync for RecordingSync {
    fn sync_folder_to(&self, local: &Path, remote_url: &str) -> Result<(), SyncError> {
        self.calls
            .lock()
            .unwrap()
            .push((local.to_path_buf(), remote_url.to_string()));
        if self.fail {
            return Err(SyncError::Launch {
                program: "aws".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no aws"),
            });
        }
        Ok(())
    }

    fn sync_folder_from(&self, _remote_url: &str, _local: &Path) -> Result<(), SyncError> {
        Ok(())
    }
}

#[test]
fn test_end_to_end_run_produces_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let records = write_records(dir.path(), &phishing_records(100));
    let settings = test_settings(dir.path());
    let tracker = tracking::from_settings(&settings.tracker).unwrap();
    let sync = RecordingSync::default();

    let mut pipeline = TrainingPipeline::new(settings, Box::new(JsonFileSource::new(&records)), tracker)
        .unwrap()
        .with_cloud_sync(Box::new(sync.clone()));
    let run_dir = pipeline.config().artifact_dir.clone();
    let model_dir = pipeline.config().model_dir.clone();
    let artifact = pipeline.run().unwrap();

    // ingestion: 80/20 split of every record
    let train = read_table(run_dir.join("data_ingestion/ingested/train.csv")).unwrap();
    let test = read_table(run_dir.join("data_ingestion/ingested/test.csv")).unwrap();
    assert_eq!(train.n_rows(), 80);
    assert_eq!(test.n_rows(), 20);
    assert_eq!(train.n_cols(), 6);
    assert!(train.column_index("_id").is_none());
    assert!(run_dir
        .join("data_ingestion/feature_store/phisingData.csv")
        .exists());

    // validation: one report entry per feature column
    let report =
        DriftReport::load(run_dir.join("data_validation/drift_report/report.yaml")).unwrap();
    assert_eq!(report.len(), 5);
    assert!(report.get("Result").is_none());
    for name in common::FEATURES {
        let drift = report.get(name).unwrap();
        assert!((0.0..=1.0).contains(&drift.p_value));
    }
    assert!(run_dir.join("data_validation/validated/train.csv").exists());

    // transformation: five features plus the remapped label, nothing missing
    let train_arr = load_array(run_dir.join("data_transformation/transformed/train.npy")).unwrap();
    let test_arr = load_array(run_dir.join("data_transformation/transformed/test.npy")).unwrap();
    assert_eq!(train_arr.dim(), (80, 6));
    assert_eq!(test_arr.dim(), (20, 6));
    assert!(train_arr.iter().all(|v| !v.is_nan()));
    assert!(train_arr.column(5).iter().all(|&v| v == 0.0 || v == 1.0));

    // training
    for m in [artifact.train_metric_artifact, artifact.test_metric_artifact] {
        for score in [m.f1_score, m.precision_score, m.recall_score] {
            assert!((0.0..=1.0).contains(&score));
        }
    }
    assert!(artifact.trained_model_file_path.starts_with(&run_dir));
    let packaged: NetworkModel = load_object(&artifact.trained_model_file_path).unwrap();
    let predictions = packaged.predict_table(&test).unwrap();
    assert_eq!(predictions.len(), 20);

    // deployment directory holds the bare model and the preprocessor
    let preprocessor: Preprocessor = load_object(final_preprocessor_path(&model_dir)).unwrap();
    let model: Classifier = load_object(final_model_path(&model_dir)).unwrap();
    assert_eq!(preprocessor.feature_columns(), &["f1", "f2", "f3", "f4", "f5"]);
    let x_test = preprocessor.transform_table(&test).unwrap();
    assert_eq!(model.predict(&x_test).unwrap(), predictions);

    // no bucket configured
    assert!(sync.calls.lock().unwrap().is_empty());

    // one finished tracking run each for train and test
    let mut statuses: Vec<(String, String)> = std::fs::read_dir(dir.path().join("mlruns"))
        .unwrap()
        .map(|entry| LocalTracker::load_run(entry.unwrap().path()).unwrap())
        .map(|run| (run.name, run.status))
        .collect();
    statuses.sort();
    assert_eq!(
        statuses,
        vec![
            ("test".to_string(), "FINISHED".to_string()),
            ("train".to_string(), "FINISHED".to_string()),
        ]
    );
}

#[test]
fn test_bucket_triggers_both_syncs_and_failures_are_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let records = write_records(dir.path(), &phishing_records(60));
    let mut settings = test_settings(dir.path());
    settings.bucket = Some("netsec-bucket".to_string());
    let sync = RecordingSync {
        fail: true,
        ..RecordingSync::default()
    };

    let mut pipeline = TrainingPipeline::new(
        settings,
        Box::new(JsonFileSource::new(&records)),
        Box::new(NoopTracker::default()),
    )
    .unwrap()
    .with_cloud_sync(Box::new(sync.clone()));
    let timestamp = pipeline.config().timestamp.clone();
    pipeline.run().unwrap();

    let calls = sync.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, pipeline.config().artifact_dir);
    assert_eq!(calls[0].1, format!("s3://netsec-bucket/artifact/{timestamp}"));
    assert_eq!(calls[1].0, pipeline.config().model_dir);
    assert_eq!(calls[1].1, format!("s3://netsec-bucket/final_model/{timestamp}"));
}

#[test]
fn test_unreachable_score_rejects_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let records = write_records(dir.path(), &phishing_records(60));
    let mut settings = test_settings(dir.path());
    settings.expected_score = Some(1.01);

    let mut pipeline = TrainingPipeline::new(
        settings,
        Box::new(JsonFileSource::new(&records)),
        Box::new(NoopTracker::default()),
    )
    .unwrap();
    let err = pipeline.run().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelRejected);
    assert!(!pipeline.config().model_dir.join("model.bin").exists());
}

#[test]
fn test_missing_source_stops_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let settings = test_settings(dir.path());
    let mut pipeline = TrainingPipeline::new(
        settings,
        Box::new(JsonFileSource::new(dir.path().join("absent.json"))),
        Box::new(NoopTracker::default()),
    )
    .unwrap();
    let err = pipeline.run().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    assert!(!pipeline
        .config()
        .artifact_dir
        .join("data_ingestion/ingested/train.csv")
        .exists());
}

#[test]
fn test_invalid_settings_are_rejected_up_front() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.train_test_split_ratio = 1.5;
    let err = TrainingPipeline::new(
        settings,
        Box::new(JsonFileSource::new(dir.path().join("records.json"))),
        Box::new(NoopTracker::default()),
    )
    .err()
    .unwrap();
    assert_eq!(err.kind(), ErrorKind::Config);
}
