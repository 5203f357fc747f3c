use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError, Result, ResultExt};

/// Split quality criterion for tree based families.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SplitCriterion {
    Gini,
    Entropy,
}

/// A single, fully specified candidate model configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum ModelType {
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
    },
    DecisionTree {
        criterion: SplitCriterion,
        max_depth: Option<usize>,
    },
    GradientBoosting {
        learning_rate: f32,
        subsample: f64,
        n_estimators: usize,
        max_depth: u32,
    },
    LogisticRegression {
        alpha: f64,
        max_iterations: u64,
    },
    AdaBoost {
        learning_rate: f64,
        n_estimators: usize,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::RandomForest {
            n_estimators: 100,
            max_depth: None,
        }
    }
}

impl ModelType {
    /// Human readable family name, used as the key of the model report.
    pub fn family(&self) -> &'static str {
        match self {
            ModelType::RandomForest { .. } => "Random Forest",
            ModelType::DecisionTree { .. } => "Decision Tree",
            ModelType::GradientBoosting { .. } => "Gradient Boosting",
            ModelType::LogisticRegression { .. } => "Logistic Regression",
            ModelType::AdaBoost { .. } => "AdaBoost",
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(|c: char| c == '-' || c == ' ', "_").as_str() {
            "random_forest" => Ok(ModelType::default()),
            "decision_tree" => Ok(ModelType::DecisionTree {
                criterion: SplitCriterion::Gini,
                max_depth: None,
            }),
            "gradient_boosting" => Ok(ModelType::GradientBoosting {
                learning_rate: 0.1,
                subsample: 1.0,
                n_estimators: 100,
                max_depth: 3,
            }),
            "logistic_regression" => Ok(ModelType::LogisticRegression {
                alpha: 1.0,
                max_iterations: 100,
            }),
            "adaboost" => Ok(ModelType::AdaBoost {
                learning_rate: 1.0,
                n_estimators: 50,
            }),
            _ => Err(format!(
                "Unknown model type: {}. Valid options are: random_forest, decision_tree, \
                 gradient_boosting, logistic_regression, adaboost",
                s
            )),
        }
    }
}

/// Hyper-parameter grid for one candidate family.
///
/// An empty list means "use the family default" for that parameter, so a
/// family with every list empty is evaluated exactly once.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum SearchSpace {
    RandomForest {
        #[serde(default)]
        n_estimators: Vec<usize>,
    },
    DecisionTree {
        #[serde(default)]
        criterion: Vec<SplitCriterion>,
    },
    GradientBoosting {
        #[serde(default)]
        learning_rate: Vec<f32>,
        #[serde(default)]
        subsample: Vec<f64>,
        #[serde(default)]
        n_estimators: Vec<usize>,
    },
    LogisticRegression,
    AdaBoost {
        #[serde(default)]
        learning_rate: Vec<f64>,
        #[serde(default)]
        n_estimators: Vec<usize>,
    },
}

fn or_default<T: Clone>(values: &[T], default: T) -> Vec<T> {
    if values.is_empty() {
        vec![default]
    } else {
        values.to_vec()
    }
}

impl SearchSpace {
    pub fn family(&self) -> &'static str {
        self.default_model().family()
    }

    fn default_model(&self) -> ModelType {
        let key = match self {
            SearchSpace::RandomForest { .. } => "random_forest",
            SearchSpace::DecisionTree { .. } => "decision_tree",
            SearchSpace::GradientBoosting { .. } => "gradient_boosting",
            SearchSpace::LogisticRegression => "logistic_regression",
            SearchSpace::AdaBoost { .. } => "adaboost",
        };
        ModelType::from_str(key).unwrap_or_default()
    }

    /// Expand the grid into every concrete configuration, in a stable order.
    pub fn candidates(&self) -> Vec<ModelType> {
        match (self, self.default_model()) {
            (
                SearchSpace::RandomForest { n_estimators },
                ModelType::RandomForest {
                    n_estimators: d_n,
                    max_depth,
                },
            ) => or_default(n_estimators, d_n)
                .into_iter()
                .map(|n_estimators| ModelType::RandomForest {
                    n_estimators,
                    max_depth,
                })
                .collect(),
            (
                SearchSpace::DecisionTree { criterion },
                ModelType::DecisionTree {
                    criterion: d_c,
                    max_depth,
                },
            ) => or_default(criterion, d_c)
                .into_iter()
                .map(|criterion| ModelType::DecisionTree {
                    criterion,
                    max_depth,
                })
                .collect(),
            (
                SearchSpace::GradientBoosting {
                    learning_rate,
                    subsample,
                    n_estimators,
                },
                ModelType::GradientBoosting {
                    learning_rate: d_lr,
                    subsample: d_ss,
                    n_estimators: d_n,
                    max_depth,
                },
            ) => {
                let mut out = Vec::new();
                for &lr in &or_default(learning_rate, d_lr) {
                    for &ss in &or_default(subsample, d_ss) {
                        for &n in &or_default(n_estimators, d_n) {
                            out.push(ModelType::GradientBoosting {
                                learning_rate: lr,
                                subsample: ss,
                                n_estimators: n,
                                max_depth,
                            });
                        }
                    }
                }
                out
            }
            (
                SearchSpace::AdaBoost {
                    learning_rate,
                    n_estimators,
                },
                ModelType::AdaBoost {
                    learning_rate: d_lr,
                    n_estimators: d_n,
                },
            ) => {
                let mut out = Vec::new();
                for &lr in &or_default(learning_rate, d_lr) {
                    for &n in &or_default(n_estimators, d_n) {
                        out.push(ModelType::AdaBoost {
                            learning_rate: lr,
                            n_estimators: n,
                        });
                    }
                }
                out
            }
            (_, default) => vec![default],
        }
    }
}

/// The fixed candidate roster in evaluation order. Ties in model selection
/// resolve to whichever family appears first here.
pub fn default_search_spaces() -> Vec<SearchSpace> {
    vec![
        SearchSpace::RandomForest {
            n_estimators: vec![8, 16, 32, 128, 256],
        },
        SearchSpace::DecisionTree {
            criterion: vec![SplitCriterion::Gini, SplitCriterion::Entropy],
        },
        SearchSpace::GradientBoosting {
            learning_rate: vec![0.1, 0.01, 0.05, 0.001],
            subsample: vec![0.6, 0.7, 0.75, 0.85, 0.9],
            n_estimators: vec![8, 16, 32, 64, 128, 256],
        },
        SearchSpace::LogisticRegression,
        SearchSpace::AdaBoost {
            learning_rate: vec![0.1, 0.01, 0.001],
            n_estimators: vec![8, 16, 32, 64, 128, 256],
        },
    ]
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImputerWeights {
    Uniform,
    Distance,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ImputerSettings {
    pub n_neighbors: usize,
    pub weights: ImputerWeights,
}

impl Default for ImputerSettings {
    fn default() -> Self {
        Self {
            n_neighbors: 3,
            weights: ImputerWeights::Uniform,
        }
    }
}

/// Where experiment runs are recorded.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerSettings {
    /// One directory per run under `dir`.
    Local { dir: PathBuf },
    /// MLflow REST API; endpoint and credentials come from the environment.
    Mlflow {
        #[serde(default)]
        experiment_id: Option<String>,
    },
    None,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings::Local {
            dir: PathBuf::from("mlruns"),
        }
    }
}

/// Every tunable of a training run. Loaded from JSON; absent keys keep their
/// defaults.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    pub pipeline_name: String,
    pub artifact_dir: PathBuf,
    pub final_model_dir: PathBuf,
    pub database_name: String,
    pub collection_name: String,
    pub schema_file: PathBuf,
    pub target_column: String,
    pub train_test_split_ratio: f64,
    pub split_seed: Option<u64>,
    pub drift_threshold: f64,
    pub fail_on_schema_mismatch: bool,
    pub imputer: ImputerSettings,
    pub cv_folds: usize,
    pub model_seed: Option<u64>,
    pub expected_score: Option<f64>,
    pub overfitting_threshold: f64,
    pub search_spaces: Vec<SearchSpace>,
    pub tracker: TrackerSettings,
    pub bucket: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            pipeline_name: "NetworkSecurity".to_string(),
            artifact_dir: PathBuf::from("Artifacts"),
            final_model_dir: PathBuf::from("final_model"),
            database_name: "KRISHAI".to_string(),
            collection_name: "NetworkData".to_string(),
            schema_file: PathBuf::from("data_schema/schema.yaml"),
            target_column: "Result".to_string(),
            train_test_split_ratio: 0.2,
            split_seed: None,
            drift_threshold: 0.05,
            fail_on_schema_mismatch: false,
            imputer: ImputerSettings::default(),
            cv_folds: 3,
            model_seed: None,
            expected_score: None,
            overfitting_threshold: 0.05,
            search_spaces: default_search_spaces(),
            tracker: TrackerSettings::default(),
            bucket: None,
        }
    }
}

impl PipelineSettings {
    /// Load settings from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .or_kind(ErrorKind::Config, || format!("Failed to read config: {}", path.display()))?;
        let settings: PipelineSettings = serde_json::from_str(&content)
            .or_kind(ErrorKind::Config, || format!("Failed to parse config: {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.train_test_split_ratio > 0.0 && self.train_test_split_ratio < 1.0) {
            return Err(PipelineError::config(format!(
                "train_test_split_ratio must be in (0, 1), got {}",
                self.train_test_split_ratio
            )));
        }
        if !(self.drift_threshold > 0.0 && self.drift_threshold < 1.0) {
            return Err(PipelineError::config(format!(
                "drift_threshold must be in (0, 1), got {}",
                self.drift_threshold
            )));
        }
        if self.imputer.n_neighbors == 0 {
            return Err(PipelineError::config("imputer.n_neighbors must be at least 1"));
        }
        if self.cv_folds < 2 {
            return Err(PipelineError::config(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.search_spaces.is_empty() {
            return Err(PipelineError::config("search_spaces must name at least one family"));
        }
        if self.target_column.is_empty() {
            return Err(PipelineError::config("target_column must not be empty"));
        }
        Ok(())
    }
}
