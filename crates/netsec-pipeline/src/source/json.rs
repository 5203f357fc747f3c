use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::source::{Document, DocumentSource};

/// Documents from a local file, either a JSON array of objects or JSON lines.
///
/// The database and collection names are ignored; the file is the collection.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

fn into_document(value: Value, index: usize) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(PipelineError::data_format(format!(
            "record {index} is not a JSON object: {other}"
        ))),
    }
}

pub fn parse_documents(text: &str) -> Result<Vec<Document>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(trimmed)
            .or_kind(ErrorKind::DataFormat, || "Invalid JSON array of documents".to_string())?;
        return values
            .into_iter()
            .enumerate()
            .map(|(i, v)| into_document(v, i))
            .collect();
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let value: Value = serde_json::from_str(line)
                .or_kind(ErrorKind::DataFormat, || format!("Invalid JSON on line {}", i + 1))?;
            into_document(value, i)
        })
        .collect()
}

impl DocumentSource for JsonFileSource {
    fn fetch(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let text = std::fs::read_to_string(&self.path).or_kind(ErrorKind::SourceUnavailable, || {
            format!("Failed to read {}", self.path.display())
        })?;
        let documents = parse_documents(&text)?;
        log::info!(
            "Loaded {} documents for {}.{} from {}",
            documents.len(),
            database,
            collection,
            self.path.display()
        );
        Ok(documents)
    }

    fn describe(&self) -> String {
        format!("JSON file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_arrays_and_lines() {
        let array = parse_documents(r#"[{"a": 1}, {"a": 2, "b": "na"}]"#).unwrap();
        assert_eq!(array.len(), 2);
        let lines = parse_documents("{\"a\": 1}\n\n{\"a\": 2}\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["a"], 2);
    }

    #[test]
    fn rejects_non_objects() {
        let err = parse_documents("[1, 2]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let source = JsonFileSource::new("/no/such/records.json");
        let err = source.fetch("db", "coll").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert!(err.is_retryable());
    }
}
