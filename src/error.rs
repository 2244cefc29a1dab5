//! Error types for a pipeline run.

use std::path::PathBuf;

use thiserror::Error;

/// Run-level failures. Each one terminates the run in the `Failed` state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Unsupported extension or unreadable/malformed source.
    #[error("format error for {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// Required canonical columns are missing after normalization.
    #[error("schema error: missing required columns {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Every row was rejected (or there were no rows).
    #[error("no valid data: {}", describe_empty(.total))]
    EmptyResult { total: usize },

    /// Unexpected failure while aggregating or exporting.
    #[error("system error: {0}")]
    System(String),
}

fn describe_empty(total: &usize) -> String {
    if *total == 0 {
        "the source has no data rows".to_string()
    } else {
        format!("all {total} rows were rejected")
    }
}

impl PipelineError {
    pub fn format(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short name of the failure class, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Format { .. } => "FormatError",
            Self::Schema { .. } => "SchemaError",
            Self::EmptyResult { .. } => "EmptyResultError",
            Self::System(_) => "SystemError",
        }
    }
}

/// Per-row validation failures. Never escapes the validator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("credits out of range: {0:?}")]
    CreditsOutOfRange(String),

    #[error("invalid grade: {0:?}")]
    InvalidGrade(String),
}

/// Internal aggregation faults, reported to callers as `PipelineError::System`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("grouping column '{0}' is not present in the schema")]
    MissingGroupingColumn(String),

    #[error("failed to render {artifact}: {reason}")]
    Render { artifact: String, reason: String },
}

impl From<AggregateError> for PipelineError {
    fn from(err: AggregateError) -> Self {
        Self::System(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
