//! Story revision from feedback.
//!
//! The same operation serves the automatic post-critique pass and every
//! user-requested change; the feedback's source does not alter the call.

use super::generate;
use super::prompts::refine_prompt;
use super::Stage;
use crate::backend::{BackendError, TextBackend};
use crate::error::GenerationError;
use crate::story::{Feedback, StoryDraft};
use std::sync::Arc;
use tracing::instrument;

/// Rewrites a draft given feedback, producing the next version.
#[derive(Clone)]
pub struct StoryRefiner {
    backend: Arc<dyn TextBackend>,
    age_band: String,
    temperature: f32,
}

impl StoryRefiner {
    pub fn new(backend: Arc<dyn TextBackend>, age_band: impl Into<String>, temperature: f32) -> Self {
        Self {
            backend,
            age_band: age_band.into(),
            temperature,
        }
    }

    /// Produce `draft.version() + 1`. The input draft is left untouched.
    #[instrument(skip_all, fields(version = draft.version(), source = %feedback.source()))]
    pub async fn refine(
        &self,
        draft: &StoryDraft,
        feedback: &Feedback,
    ) -> Result<StoryDraft, GenerationError> {
        let prompt = refine_prompt(draft, feedback, &self.age_band);
        let text = generate(
            self.backend.as_ref(),
            Stage::Refining,
            &prompt,
            self.temperature,
        )
        .await?;

        let revised = draft.revised(text);
        if revised.text().is_empty() {
            return Err(GenerationError::new(
                Stage::Refining,
                BackendError::empty_response(),
            ));
        }
        Ok(revised)
    }
}
