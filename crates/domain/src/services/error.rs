//! Pipeline error type.

use thiserror::Error;

/// Structural failures of a pipeline operation.
///
/// Per-job translation failures never surface here; they are recorded on the
/// job and reported in the batch outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Priority translation already active for language: {0}")]
    PriorityConflict(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("{0}")]
    Invalid(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
