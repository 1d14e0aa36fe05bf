//! First-draft generation.

use super::generate;
use super::prompts::draft_prompt;
use super::Stage;
use crate::backend::{BackendError, TextBackend};
use crate::error::GenerationError;
use crate::story::{Intent, StoryDraft, UserRequest};
use std::sync::Arc;
use tracing::instrument;

/// Writes the version-0 draft of a story.
#[derive(Clone)]
pub struct StoryDrafter {
    backend: Arc<dyn TextBackend>,
    age_band: String,
    story_length: Option<String>,
    temperature: f32,
}

impl StoryDrafter {
    pub fn new(
        backend: Arc<dyn TextBackend>,
        age_band: impl Into<String>,
        story_length: Option<String>,
        temperature: f32,
    ) -> Self {
        Self {
            backend,
            age_band: age_band.into(),
            story_length,
            temperature,
        }
    }

    /// Draft a story for `request` shaped by `intent`.
    #[instrument(skip_all, fields(category = %intent.category))]
    pub async fn draft(
        &self,
        request: &UserRequest,
        intent: &Intent,
    ) -> Result<StoryDraft, GenerationError> {
        let prompt = draft_prompt(
            request,
            intent,
            &self.age_band,
            self.story_length.as_deref(),
        );
        let text = generate(
            self.backend.as_ref(),
            Stage::Drafting,
            &prompt,
            self.temperature,
        )
        .await?;

        let draft = StoryDraft::initial(text);
        if draft.text().is_empty() {
            return Err(GenerationError::new(
                Stage::Drafting,
                BackendError::empty_response(),
            ));
        }
        Ok(draft)
    }
}
