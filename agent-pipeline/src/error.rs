//! Error taxonomy shared across the pipeline service.

use thiserror::Error;

/// Convenience alias used throughout the service crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// All failure classes the pipeline distinguishes.
///
/// The class decides both the HTTP status (see `http.rs`) and the recovery
/// policy: `Upstream` degrades to documented defaults outside of task
/// execution, `TaskExecution` feeds the retry path, everything else surfaces
/// to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("completion service error: {0}")]
    Upstream(String),

    #[error("task execution failed: {0}")]
    TaskExecution(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PipelineError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        PipelineError::NotFound(msg.into())
    }

    pub fn upstream(err: impl std::fmt::Display) -> Self {
        PipelineError::Upstream(err.to_string())
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}
