//! Story data model: requests, intents, drafts and feedback.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Category used when the analyzer cannot extract one.
pub const FALLBACK_CATEGORY: &str = "general";

/// Raw free-text description of the story a user wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequest(String);

impl UserRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserRequest {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for UserRequest {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Structured summary of a request.
///
/// `category` is never empty. `character` and `setting` are empty when the
/// request did not mention them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub category: String,
    pub character: String,
    pub setting: String,
}

impl Intent {
    /// Build an intent, normalizing blank fields.
    pub fn new(
        category: impl Into<String>,
        character: impl Into<String>,
        setting: impl Into<String>,
    ) -> Self {
        let category = category.into();
        let category = match category.trim() {
            "" => FALLBACK_CATEGORY.to_string(),
            trimmed => trimmed.to_string(),
        };
        Self {
            category,
            character: character.into().trim().to_string(),
            setting: setting.into().trim().to_string(),
        }
    }

    /// The intent used whenever extraction fails.
    pub fn fallback() -> Self {
        Self {
            category: FALLBACK_CATEGORY.to_string(),
            character: String::new(),
            setting: String::new(),
        }
    }

    /// Parse the analyzer's JSON object.
    ///
    /// All three keys must be present. `category` must be a string;
    /// `character` and `setting` may be strings or null.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let object = value
            .as_object()
            .ok_or_else(|| format!("expected a JSON object, got {value}"))?;

        let category = match object.get("category") {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => return Err(format!("category must be a string, got {other}")),
            None => return Err("missing key: category".to_string()),
        };
        let optional = |key: &str| match object.get(key) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(Value::Null) => Ok(""),
            Some(other) => Err(format!("{key} must be a string, got {other}")),
            None => Err(format!("missing key: {key}")),
        };

        Ok(Self::new(category, optional("character")?, optional("setting")?))
    }

    pub fn has_character(&self) -> bool {
        !self.character.is_empty()
    }

    pub fn has_setting(&self) -> bool {
        !self.setting.is_empty()
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self::fallback()
    }
}

/// One revision of the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryDraft {
    text: String,
    version: u32,
}

impl StoryDraft {
    /// The first draft of a story (version 0).
    pub fn initial(text: impl AsRef<str>) -> Self {
        Self {
            text: clean_story_text(text.as_ref()),
            version: 0,
        }
    }

    /// A revision that supersedes `self`, one version later.
    pub fn revised(&self, text: impl AsRef<str>) -> Self {
        Self {
            text: clean_story_text(text.as_ref()),
            version: self.version + 1,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Paragraphs of the story, split on blank lines.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

impl fmt::Display for StoryDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Strip asterisks and surrounding whitespace from generated story text.
pub fn clean_story_text(text: &str) -> String {
    text.replace('*', "").trim().to_string()
}

/// Who wrote a piece of feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackSource {
    /// The automatic critique pass.
    Critic,
    /// A revision request typed by the user.
    User,
}

impl fmt::Display for FeedbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackSource::Critic => f.write_str("critic"),
            FeedbackSource::User => f.write_str("user"),
        }
    }
}

/// Free-text critique of one draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    text: String,
    source: FeedbackSource,
    draft_version: u32,
}

impl Feedback {
    /// Feedback produced by the critic for `draft`.
    pub fn from_critic(draft: &StoryDraft, text: impl AsRef<str>) -> Self {
        Self {
            text: text.as_ref().trim().to_string(),
            source: FeedbackSource::Critic,
            draft_version: draft.version(),
        }
    }

    /// Feedback supplied by the user for `draft`.
    pub fn from_user(draft: &StoryDraft, text: impl AsRef<str>) -> Self {
        Self {
            text: text.as_ref().trim().to_string(),
            source: FeedbackSource::User,
            draft_version: draft.version(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> FeedbackSource {
        self.source
    }

    /// Version of the draft this feedback critiques.
    pub fn draft_version(&self) -> u32 {
        self.draft_version
    }
}
