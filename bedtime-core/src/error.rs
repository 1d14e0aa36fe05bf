//! Error types for the story pipeline.

use crate::backend::BackendError;
use crate::session::SessionState;
use crate::stages::Stage;
use thiserror::Error;

/// A drafting, critique or refinement call failed.
///
/// Carries the stage that failed and the backend's cause. The pipeline never
/// retries on its own; callers decide whether to run the stage again.
#[derive(Debug, Clone, Error)]
#[error("{stage} failed: {source}")]
pub struct GenerationError {
    pub stage: Stage,
    #[source]
    pub source: BackendError,
}

impl GenerationError {
    pub fn new(stage: Stage, source: BackendError) -> Self {
        Self { stage, source }
    }
}

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Backend unavailable: {0}")]
    Backend(#[from] BackendError),

    #[error("Operation not allowed while {0}")]
    InvalidState(SessionState),

    #[error("Session is already finished")]
    Finished,

    #[error("Session has not finished yet")]
    NotFinished,

    #[error("No user input available")]
    InputClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// The failed stage, for generation errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SessionError::Generation(e) => Some(e.stage),
            _ => None,
        }
    }
}
