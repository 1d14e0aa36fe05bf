//! Automatic critique of a draft.

use super::generate;
use super::prompts::critique_prompt;
use super::Stage;
use crate::backend::TextBackend;
use crate::error::GenerationError;
use crate::story::{Feedback, StoryDraft};
use std::sync::Arc;
use tracing::instrument;

/// Reviews a draft and suggests one or two improvements.
///
/// The feedback is prose for the refiner; nothing here parses it.
#[derive(Clone)]
pub struct StoryCritic {
    backend: Arc<dyn TextBackend>,
    age_band: String,
    temperature: f32,
}

impl StoryCritic {
    pub fn new(backend: Arc<dyn TextBackend>, age_band: impl Into<String>, temperature: f32) -> Self {
        Self {
            backend,
            age_band: age_band.into(),
            temperature,
        }
    }

    #[instrument(skip_all, fields(version = draft.version()))]
    pub async fn critique(&self, draft: &StoryDraft) -> Result<Feedback, GenerationError> {
        let prompt = critique_prompt(draft, &self.age_band);
        let text = generate(
            self.backend.as_ref(),
            Stage::Critiquing,
            &prompt,
            self.temperature,
        )
        .await?;
        Ok(Feedback::from_critic(draft, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::FeedbackSource;
    use crate::testing::MockBackend;

    #[tokio::test]
    async fn test_critique_pairs_feedback_with_draft() {
        let backend = Arc::new(MockBackend::new().reply("The pacing is rushed in the middle."));
        let critic = StoryCritic::new(backend.clone(), "5-10", 0.7);
        let draft = StoryDraft::initial("Pip flew.");

        let feedback = critic.critique(&draft).await.unwrap();

        assert_eq!(feedback.text(), "The pacing is rushed in the middle.");
        assert_eq!(feedback.source(), FeedbackSource::Critic);
        assert_eq!(feedback.draft_version(), 0);
        let calls = backend.calls();
        assert_eq!(calls[0].temperature, 0.7);
        assert!(calls[0].prompt.contains("STORY:\nPip flew."));
    }

    #[tokio::test]
    async fn test_blank_critique_is_a_failure() {
        let backend = Arc::new(MockBackend::new().reply("   \n"));
        let critic = StoryCritic::new(backend, "5-10", 0.7);

        let err = critic
            .critique(&StoryDraft::initial("Pip flew."))
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Critiquing);
        assert_eq!(
            err.to_string(),
            "Story critique failed: backend returned an empty response"
        );
    }
}
