//! Directory sync to S3 through the AWS CLI.
use std::path::Path;
use std::process::Command;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

pub trait CloudSync {
    fn sync_folder_to(&self, local: &Path, remote_url: &str) -> Result<(), SyncError>;
    fn sync_folder_from(&self, remote_url: &str, local: &Path) -> Result<(), SyncError>;
}

/// Shells out to `aws s3 sync <src> <dst>`.
#[derive(Debug, Clone)]
pub struct AwsCliSync {
    program: String,
}

impl Default for AwsCliSync {
    fn default() -> Self {
        Self {
            program: "aws".to_string(),
        }
    }
}

impl AwsCliSync {
    /// Use a different executable, e.g. a wrapper script.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, src: &str, dst: &str) -> Result<(), SyncError> {
        let command = format!("{} s3 sync {} {}", self.program, src, dst);
        log::debug!("Running {command}");
        let output = Command::new(&self.program)
            .args(["s3", "sync", src, dst])
            .output()
            .map_err(|source| SyncError::Launch {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(SyncError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl CloudSync for AwsCliSync {
    fn sync_folder_to(&self, local: &Path, remote_url: &str) -> Result<(), SyncError> {
        self.run(&local.to_string_lossy(), remote_url)
    }

    fn sync_folder_from(&self, remote_url: &str, local: &Path) -> Result<(), SyncError> {
        self.run(remote_url, &local.to_string_lossy())
    }
}

pub fn artifact_url(bucket: &str, timestamp: &str) -> String {
    format!("s3://{bucket}/artifact/{timestamp}")
}

pub fn final_model_url(bucket: &str, timestamp: &str) -> String {
    format!("s3://{bucket}/final_model/{timestamp}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_keyed_by_bucket_and_timestamp() {
        assert_eq!(
            artifact_url("netsec", "01_02_2025_10_00_00"),
            "s3://netsec/artifact/01_02_2025_10_00_00"
        );
        assert_eq!(
            final_model_url("netsec", "ts"),
            "s3://netsec/final_model/ts"
        );
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let sync = AwsCliSync::with_program("netsec-no-such-binary");
        let err = sync
            .sync_folder_to(Path::new("."), "s3://bucket/x")
            .unwrap_err();
        assert!(matches!(err, SyncError::Launch { .. }));
    }
}
