use anyhow::{Context, Result};
use clap::ArgMatches;
use std::path::PathBuf;

use netsec_pipeline::config::{PipelineSettings, TrackerSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Mongo,
    Json,
}

impl SourceKind {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "mongo" => Ok(SourceKind::Mongo),
            "json" => Ok(SourceKind::Json),
            other => anyhow::bail!("Unknown source '{}', expected mongo or json", other),
        }
    }
}

/// Command line overrides of the `train` subcommand. Every field left as
/// `None` keeps the value from the settings file.
#[derive(Debug, Clone, Default)]
pub struct TrainOverrides {
    pub source: Option<String>,
    pub input: Option<PathBuf>,
    pub artifact_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub tracker: Option<String>,
    pub bucket: Option<String>,
}

impl TrainOverrides {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            source: matches.get_one::<String>("source").cloned(),
            input: matches.get_one::<PathBuf>("input").cloned(),
            artifact_dir: matches.get_one::<PathBuf>("artifact_dir").cloned(),
            seed: matches.get_one::<u64>("seed").copied(),
            tracker: matches.get_one::<String>("tracker").cloned(),
            bucket: matches.get_one::<String>("bucket").cloned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub settings: PipelineSettings,
    pub source: SourceKind,
    /// Records file for the `json` source.
    pub input: Option<PathBuf>,
}

impl TrainConfig {
    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let settings = match config_path {
            Some(path) => PipelineSettings::load(path)
                .with_context(|| format!("Failed to load settings: {:?}", path))?,
            None => PipelineSettings::default(),
        };
        Self::with_overrides(settings, TrainOverrides::from_matches(matches))
    }

    pub fn with_overrides(mut settings: PipelineSettings, overrides: TrainOverrides) -> Result<Self> {
        if let Some(dir) = overrides.artifact_dir {
            settings.artifact_dir = dir;
        }

        if let Some(seed) = overrides.seed {
            settings.split_seed = Some(seed);
            settings.model_seed = Some(seed);
        }

        if let Some(tracker) = overrides.tracker.as_deref() {
            settings.tracker = match (tracker, &settings.tracker) {
                ("local", TrackerSettings::Local { .. }) => settings.tracker.clone(),
                ("local", _) => TrackerSettings::default(),
                ("mlflow", TrackerSettings::Mlflow { .. }) => settings.tracker.clone(),
                ("mlflow", _) => TrackerSettings::Mlflow {
                    experiment_id: None,
                },
                ("none", _) => TrackerSettings::None,
                (other, _) => anyhow::bail!(
                    "Unknown tracker '{}', expected local, mlflow or none",
                    other
                ),
            };
        }

        if let Some(bucket) = overrides.bucket {
            settings.bucket = Some(bucket);
        }

        // a records file implies the json source unless one is named
        let source = match overrides.source.as_deref() {
            Some(name) => SourceKind::parse(name)?,
            None if overrides.input.is_some() => SourceKind::Json,
            None => SourceKind::Mongo,
        };
        if source == SourceKind::Json && overrides.input.is_none() {
            anyhow::bail!("--input is required with the json source");
        }
        if let Some(input) = &overrides.input {
            if !input.exists() {
                anyhow::bail!("File does not exist: {}", input.display());
            }
        }

        settings.validate()?;
        Ok(Self {
            settings,
            source,
            input: overrides.input,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_and_paths_override_settings() {
        let overrides = TrainOverrides {
            artifact_dir: Some(PathBuf::from("runs")),
            seed: Some(11),
            tracker: Some("none".to_string()),
            bucket: Some("my-bucket".to_string()),
            ..TrainOverrides::default()
        };
        let config = TrainConfig::with_overrides(PipelineSettings::default(), overrides).unwrap();
        assert_eq!(config.settings.artifact_dir, PathBuf::from("runs"));
        assert_eq!(config.settings.split_seed, Some(11));
        assert_eq!(config.settings.model_seed, Some(11));
        assert_eq!(config.settings.tracker, TrackerSettings::None);
        assert_eq!(config.settings.bucket.as_deref(), Some("my-bucket"));
        assert_eq!(config.source, SourceKind::Mongo);
    }

    #[test]
    fn local_tracker_keeps_configured_directory() {
        let settings = PipelineSettings {
            tracker: TrackerSettings::Local {
                dir: PathBuf::from("elsewhere"),
            },
            ..PipelineSettings::default()
        };
        let overrides = TrainOverrides {
            tracker: Some("local".to_string()),
            ..TrainOverrides::default()
        };
        let config = TrainConfig::with_overrides(settings, overrides).unwrap();
        assert_eq!(
            config.settings.tracker,
            TrackerSettings::Local {
                dir: PathBuf::from("elsewhere")
            }
        );
    }

    #[test]
    fn json_source_needs_an_existing_input() {
        let overrides = TrainOverrides {
            source: Some("json".to_string()),
            ..TrainOverrides::default()
        };
        assert!(TrainConfig::with_overrides(PipelineSettings::default(), overrides).is_err());

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("records.json");
        std::fs::write(&input, "[]").unwrap();
        let overrides = TrainOverrides {
            input: Some(input.clone()),
            ..TrainOverrides::default()
        };
        let config = TrainConfig::with_overrides(PipelineSettings::default(), overrides).unwrap();
        assert_eq!(config.source, SourceKind::Json);
        assert_eq!(config.input, Some(input));
    }

    #[test]
    fn unknown_names_are_rejected() {
        for overrides in [
            TrainOverrides {
                tracker: Some("wandb".to_string()),
                ..TrainOverrides::default()
            },
            TrainOverrides {
                source: Some("s3".to_string()),
                ..TrainOverrides::default()
            },
        ] {
            assert!(TrainConfig::with_overrides(PipelineSettings::default(), overrides).is_err());
        }
    }
}
