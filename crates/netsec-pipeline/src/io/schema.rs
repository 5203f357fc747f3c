//! YAML files: the expected-columns schema and the drift report.
use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result, ResultExt};
use crate::io::ensure_parent_dir;

/// Expected columns of the ingested table.
///
/// ```yaml
/// columns:
///   - having_IP_Address: int64
///   - Result: int64
/// numerical_columns:
///   - having_IP_Address
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub columns: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    pub numerical_columns: Vec<String>,
}

impl Schema {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).or_kind(ErrorKind::Persistence, || {
            format!("Failed to read schema {}", path.display())
        })?;
        serde_yaml::from_str(&text).or_kind(ErrorKind::DataFormat, || {
            format!("Failed to parse schema {}", path.display())
        })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|entry| entry.keys().cloned())
            .collect()
    }
}

/// Per-column drift test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub p_value: f64,
    pub drift_status: bool,
}

/// Column name to drift outcome, in table column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriftReport {
    pub entries: Vec<(String, ColumnDrift)>,
}

impl DriftReport {
    pub fn push(&mut self, column: impl Into<String>, drift: ColumnDrift) {
        self.entries.push((column.into(), drift));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&ColumnDrift> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, d)| d)
    }

    pub fn drifted_columns(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, d)| d.drift_status)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Render as a YAML mapping keyed by column name.
    pub fn to_yaml(&self) -> Result<String> {
        let mut mapping = serde_yaml::Mapping::new();
        for (name, drift) in &self.entries {
            let value = serde_yaml::to_value(drift)
                .or_kind(ErrorKind::Persistence, || format!("Failed to encode drift for {name}"))?;
            mapping.insert(serde_yaml::Value::String(name.clone()), value);
        }
        serde_yaml::to_string(&mapping)
            .or_kind(ErrorKind::Persistence, || "Failed to encode drift report".to_string())
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let text = self.to_yaml()?;
        std::fs::write(path, text).or_kind(ErrorKind::Persistence, || {
            format!("Failed to write drift report {}", path.display())
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).or_kind(ErrorKind::Persistence, || {
            format!("Failed to read drift report {}", path.display())
        })?;
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(&text).or_kind(
            ErrorKind::DataFormat,
            || format!("Failed to parse drift report {}", path.display()),
        )?;
        let mut report = DriftReport::default();
        for (key, value) in mapping {
            let name = key.as_str().map(str::to_string).unwrap_or_default();
            let drift: ColumnDrift = serde_yaml::from_value(value)
                .or_kind(ErrorKind::DataFormat, || format!("Bad drift entry for '{name}'"))?;
            report.push(name, drift);
        }
        Ok(report)
    }
}
