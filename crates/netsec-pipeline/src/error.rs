//! Error type shared by every pipeline stage.
//!
//! Each failure is tagged with an [`ErrorKind`] and the source location where it
//! was raised, so a single log line is enough for a postmortem.
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;

pub type Result<T> = std::result::Result<T, PipelineError>;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// What went wrong, coarse enough for a caller to decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The document store could not be reached or queried.
    SourceUnavailable,
    /// A file or document did not have the expected shape or values.
    DataFormat,
    /// The table does not match the schema definition.
    SchemaMismatch,
    /// A two-sample drift test could not be computed.
    DriftComputation,
    /// The missing-value imputer could not be fitted or applied.
    Imputation,
    /// No candidate model could be trained.
    Training,
    /// The best model did not pass the acceptance gate.
    ModelRejected,
    /// Reading or writing an artifact failed.
    Persistence,
    /// The experiment tracker rejected a request.
    Tracking,
    /// Settings are invalid.
    Config,
}

impl ErrorKind {
    /// Transient failures that a caller may reasonably retry.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::SourceUnavailable | ErrorKind::Tracking)
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::SourceUnavailable => "source unavailable",
            ErrorKind::DataFormat => "data format",
            ErrorKind::SchemaMismatch => "schema mismatch",
            ErrorKind::DriftComputation => "drift computation",
            ErrorKind::Imputation => "imputation",
            ErrorKind::Training => "training",
            ErrorKind::ModelRejected => "model rejected",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Tracking => "tracking",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct PipelineError {
    kind: ErrorKind,
    message: String,
    location: &'static Location<'static>,
    source: Option<BoxedSource>,
}

impl PipelineError {
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Location::caller(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping it reachable through `source()`.
    #[track_caller]
    pub fn with_source<E>(kind: ErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        Self {
            kind,
            message: message.into(),
            location: Location::caller(),
            source: Some(source.into()),
        }
    }

    #[track_caller]
    pub fn persistence<E: Into<BoxedSource>>(message: impl Into<String>, source: E) -> Self {
        Self::with_source(ErrorKind::Persistence, message, source)
    }

    #[track_caller]
    pub fn data_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataFormat, message)
    }

    #[track_caller]
    pub fn training(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Training, message)
    }

    #[track_caller]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `file:line` of the code that raised the error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error at {}:{}: {}",
            self.kind,
            self.location.file(),
            self.location.line(),
            self.message
        )?;
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl StdError for PipelineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Attach an [`ErrorKind`] and message to any foreign error.
pub trait ResultExt<T> {
    fn or_kind(self, kind: ErrorKind, message: impl FnOnce() -> String) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<BoxedSource>,
{
    #[track_caller]
    fn or_kind(self, kind: ErrorKind, message: impl FnOnce() -> String) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(PipelineError::with_source(kind, message(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_location_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = PipelineError::persistence("failed to read train.csv", io);
        let text = err.to_string();
        assert!(text.starts_with("persistence error at "));
        assert!(text.contains("error.rs"));
        assert!(text.ends_with("failed to read train.csv: gone"));
        assert!(err.source().is_some());
    }

    #[test]
    fn retryable_kinds() {
        assert!(ErrorKind::SourceUnavailable.is_retryable());
        assert!(ErrorKind::Tracking.is_retryable());
        assert!(!ErrorKind::SchemaMismatch.is_retryable());
        assert!(!ErrorKind::Persistence.is_retryable());
    }

    #[test]
    fn or_kind_records_caller_line() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let line = line!() + 1;
        let err = res.or_kind(ErrorKind::Persistence, || "write".into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(err.location().line(), line);
    }
}
