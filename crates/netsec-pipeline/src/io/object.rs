//! Fitted objects (preprocessor, models) are stored with bincode.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::io::ensure_parent_dir;

pub fn save_object<T: Serialize, P: AsRef<Path>>(object: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|e| PipelineError::persistence(format!("Failed to create {}", path.display()), e))?;
    bincode::serialize_into(BufWriter::new(file), object).map_err(|e| {
        PipelineError::persistence(format!("Failed to serialize object to {}", path.display()), e)
    })?;
    log::debug!("Saved object to {}", path.display());
    Ok(())
}

pub fn load_object<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| PipelineError::persistence(format!("Failed to open {}", path.display()), e))?;
    bincode::deserialize_from(BufReader::new(file)).map_err(|e| {
        PipelineError::persistence(format!("Failed to deserialize object from {}", path.display()), e)
    })
}

/// Serialize to an in-memory buffer, for handing a model to the tracker.
pub fn to_bytes<T: Serialize>(object: &T) -> Result<Vec<u8>> {
    bincode::serialize(object)
        .map_err(|e| PipelineError::persistence("Failed to serialize object", e))
}
