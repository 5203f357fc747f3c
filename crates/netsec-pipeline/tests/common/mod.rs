#![allow(dead_code)]
use std::path::{Path, PathBuf};

use netsec_pipeline::config::{PipelineSettings, SearchSpace, SplitCriterion, TrackerSettings};
use serde_json::{json, Value};

pub const FEATURES: [&str; 5] = ["f1", "f2", "f3", "f4", "f5"];

/// Phishing-style records: five features in {-1, 0, 1}, `Result` in {-1, 1}
/// driven by `f1` and `f2`, and a few `"na"` entries in `f3`.
pub fn phishing_records(n: usize) -> Vec<Value> {
    (0..n)
        .map(|r| {
            // base-3 digits of the row number, shifted to {-1, 0, 1}
            let f: Vec<i64> = (0..5u32)
                .map(|k| ((r / 3usize.pow(k)) % 3) as i64 - 1)
                .collect();
            let label = if f[0] + f[1] >= 0 { 1 } else { -1 };
            let f3 = if r % 13 == 5 { json!("na") } else { json!(f[2]) };
            json!({
                "_id": format!("doc-{r}"),
                "f1": f[0],
                "f2": f[1],
                "f3": f3,
                "f4": f[3],
                "f5": f[4],
                "Result": label,
            })
        })
        .collect()
}

pub fn write_records(dir: &Path, records: &[Value]) -> PathBuf {
    let path = dir.join("records.json");
    std::fs::write(&path, serde_json::to_string(records).unwrap()).unwrap();
    path
}

pub fn write_schema(dir: &Path, columns: &[&str]) -> PathBuf {
    let mut yaml = String::from("columns:\n");
    for c in columns {
        yaml.push_str(&format!("  - {c}: int64\n"));
    }
    yaml.push_str("numerical_columns:\n");
    for c in columns {
        yaml.push_str(&format!("  - {c}\n"));
    }
    let path = dir.join("schema.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

/// Settings pointing every output into `dir`, seeded, with a small grid.
pub fn test_settings(dir: &Path) -> PipelineSettings {
    let mut columns: Vec<&str> = FEATURES.to_vec();
    columns.push("Result");
    PipelineSettings {
        artifact_dir: dir.join("Artifacts"),
        final_model_dir: dir.join("final_model"),
        schema_file: write_schema(dir, &columns),
        split_seed: Some(42),
        model_seed: Some(42),
        search_spaces: vec![
            SearchSpace::DecisionTree {
                criterion: vec![SplitCriterion::Gini, SplitCriterion::Entropy],
            },
            SearchSpace::RandomForest {
                n_estimators: vec![8],
            },
            SearchSpace::LogisticRegression,
        ],
        tracker: TrackerSettings::Local {
            dir: dir.join("mlruns"),
        },
        ..PipelineSettings::default()
    }
}
