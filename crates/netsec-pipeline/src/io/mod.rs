//! File formats exchanged between stages: CSV tables, NPY matrices, bincode
//! objects and the YAML schema/report files.
use std::path::Path;

use crate::error::{PipelineError, Result};

pub mod csv_table;
pub mod npy;
pub mod object;
pub mod schema;

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PipelineError::persistence(
                    format!("Failed to create directory {}", parent.display()),
                    e,
                )
            })?;
        }
    }
    Ok(())
}
