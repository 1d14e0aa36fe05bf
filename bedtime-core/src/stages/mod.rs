//! Pipeline stages.
//!
//! Each stage owns a handle to the shared [`TextBackend`] and issues exactly
//! one backend call per operation.

mod analyzer;
mod critic;
mod drafter;
pub mod prompts;
mod refiner;

pub use analyzer::RequestAnalyzer;
pub use critic::StoryCritic;
pub use drafter::StoryDrafter;
pub use refiner::StoryRefiner;

use crate::backend::{BackendError, TextBackend};
use crate::error::GenerationError;
use std::fmt;
use tracing::debug;

/// A generation stage that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Drafting,
    Critiquing,
    Refining,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Drafting => f.write_str("Story drafting"),
            Stage::Critiquing => f.write_str("Story critique"),
            Stage::Refining => f.write_str("Story refinement"),
        }
    }
}

/// One backend round trip for `stage`, rejecting blank output.
async fn generate(
    backend: &dyn TextBackend,
    stage: Stage,
    prompt: &str,
    temperature: f32,
) -> Result<String, GenerationError> {
    debug!(%stage, temperature, prompt_chars = prompt.len(), "calling backend");

    let text = backend
        .complete(prompt, temperature)
        .await
        .map_err(|e| GenerationError::new(stage, e))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::new(stage, BackendError::empty_response()));
    }
    Ok(text.to_string())
}
