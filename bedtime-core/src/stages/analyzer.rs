//! Request analysis.
//!
//! Extracts a category, character and setting from the raw request with a
//! low-temperature structured-output call. Extraction never fails: any
//! backend or parse problem yields [`Intent::fallback`].

use super::prompts::analysis_prompt;
use crate::backend::TextBackend;
use crate::story::{Intent, UserRequest};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Extracts an [`Intent`] from a [`UserRequest`].
#[derive(Clone)]
pub struct RequestAnalyzer {
    backend: Arc<dyn TextBackend>,
    temperature: f32,
}

impl RequestAnalyzer {
    pub fn new(backend: Arc<dyn TextBackend>, temperature: f32) -> Self {
        Self {
            backend,
            temperature,
        }
    }

    /// Analyze a request. Always returns an intent with a non-empty category.
    #[instrument(skip_all, fields(request_chars = request.as_str().len()))]
    pub async fn analyze(&self, request: &UserRequest) -> Intent {
        let prompt = analysis_prompt(request);
        debug!(temperature = self.temperature, "calling backend for intent");

        let response = match self.backend.complete(&prompt, self.temperature).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "intent extraction call failed, using fallback intent");
                return Intent::fallback();
            }
        };

        match Intent::from_json(extract_json(&response)) {
            Ok(intent) => {
                debug!(
                    category = %intent.category,
                    character = %intent.character,
                    setting = %intent.setting,
                    "intent extracted"
                );
                intent
            }
            Err(reason) => {
                warn!(%reason, "could not parse intent, using fallback intent");
                Intent::fallback()
            }
        }
    }
}

/// Extract JSON from a response that might have markdown code blocks or
/// chatter around the object.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    // ```json ... ``` blocks
    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    // ``` ... ``` blocks without a language tag
    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    // Outermost braces
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return &text[start..=end];
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    fn analyzer(backend: MockBackend) -> (RequestAnalyzer, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (RequestAnalyzer::new(backend.clone(), 0.2), backend)
    }

    #[test]
    fn test_extract_json_plain() {
        let text = r#"{"category": "love", "character": "", "setting": ""}"#;
        assert_eq!(extract_json(text), text);
    }

    #[test]
    fn test_extract_json_markdown() {
        let text = "```json\n{\"category\": \"courage\"}\n```";
        assert_eq!(extract_json(text), r#"{"category": "courage"}"#);
    }

    #[test]
    fn test_extract_json_markdown_no_specifier() {
        let text = "```\n{\"category\": \"mystery\"}\n```";
        assert_eq!(extract_json(text), r#"{"category": "mystery"}"#);
    }

    #[test]
    fn test_extract_json_with_chatter() {
        let text = "Here you go: {\"category\": \"fantasy\"} Hope that helps!";
        assert_eq!(extract_json(text), r#"{"category": "fantasy"}"#);
    }

    #[tokio::test]
    async fn test_analyze_parses_intent() {
        let (analyzer, backend) = analyzer(MockBackend::new().reply(
            r#"{"category": "fantasy", "character": "Finn", "setting": "snowy mountains"}"#,
        ));

        let intent = analyzer
            .analyze(&UserRequest::new("Finn explores the snowy mountains"))
            .await;

        assert_eq!(intent, Intent::new("fantasy", "Finn", "snowy mountains"));
        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].temperature, 0.2);
        assert!(calls[0]
            .prompt
            .contains("\"Finn explores the snowy mountains\""));
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_garbage() {
        let (analyzer, _) = analyzer(MockBackend::new().reply("I think it's about courage!"));
        let intent = analyzer.analyze(&UserRequest::new("a brave rabbit")).await;
        assert_eq!(intent, Intent::fallback());
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_missing_keys() {
        let (analyzer, _) = analyzer(MockBackend::new().reply(r#"{"category": "courage"}"#));
        let intent = analyzer.analyze(&UserRequest::new("a brave rabbit")).await;
        assert_eq!(intent, Intent::fallback());
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_backend_error() {
        let (analyzer, _) = analyzer(MockBackend::new().fail("quota exceeded"));
        let intent = analyzer.analyze(&UserRequest::new("anything")).await;
        assert_eq!(intent.category, "general");
    }

    #[tokio::test]
    async fn test_analyze_never_returns_empty_category() {
        let replies = [
            "",
            "   ",
            "null",
            r#"{"category": "", "character": "", "setting": ""}"#,
            r#"{"category": null, "character": "", "setting": ""}"#,
            "```json\n{\"category\": \"   \", \"character\": null, \"setting\": null}\n```",
        ];
        for request in ["", "   ", "\n\t", "a dragon who is afraid of the dark"] {
            for reply in replies {
                let (analyzer, _) = analyzer(MockBackend::new().reply(reply));
                let intent = analyzer.analyze(&UserRequest::new(request)).await;
                assert!(
                    !intent.category.is_empty(),
                    "empty category for request {request:?} and reply {reply:?}"
                );
            }
        }
    }
}
